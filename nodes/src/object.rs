//! Object field groups.

opaque_groups!(ObjectCreation, ObjectGameState, ObjectScriptGameState);
