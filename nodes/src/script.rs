//! Script ownership field groups.

use bitstream::BitResult;
use schema::{SerializeNode, Serializer};

use crate::packing::optional;

/// Identity of the script that created an entity.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptObjectInfo {
    pub script_hash: u32,
    pub timestamp: u32,
    pub position_hash: Option<u32>,
    pub instance_id: Option<u8>,
    pub script_object_id: u32,
    /// Written in 3 bits when below 8, otherwise in 16.
    pub host_token: u16,
}

impl ScriptObjectInfo {
    pub(crate) fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        s.uint(&mut self.script_hash, 32)?;
        s.uint(&mut self.timestamp, 32)?;
        optional(s, &mut self.position_hash, 32)?;
        optional(s, &mut self.instance_id, 7)?;
        s.uint(&mut self.script_object_id, 32)?;
        let mut long_token = self.host_token > 7;
        s.bool(&mut long_token)?;
        s.uint(&mut self.host_token, if long_token { 16 } else { 3 })
    }
}

/// Presence bit followed by the script identity.
pub(crate) fn script_info<S: Serializer>(
    s: &mut S,
    info: &mut Option<ScriptObjectInfo>,
) -> BitResult<()> {
    let mut has_script = info.is_some();
    s.bool(&mut has_script)?;
    if has_script {
        let mut inner = info.unwrap_or_default();
        inner.serialize(s)?;
        *info = Some(inner);
    } else {
        *info = None;
    }
    Ok(())
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityScriptInfo {
    pub script: Option<ScriptObjectInfo>,
}

impl EntityScriptInfo {
    /// Hash of the owning script, 0 for ambient entities.
    #[must_use]
    pub fn script_hash(&self) -> u32 {
        self.script.map_or(0, |script| script.script_hash)
    }
}

impl SerializeNode for EntityScriptInfo {
    const NAME: &'static str = "EntityScriptInfo";

    fn serialize<S: Serializer>(&mut self, s: &mut S) -> BitResult<()> {
        script_info(s, &mut self.script)
    }
}

opaque_groups!(EntityScriptGameState, PhysicalScriptGameState);
