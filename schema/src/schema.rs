//! Schema definitions, flattening and validation.

use std::any::TypeId;
use std::collections::HashMap;

use crate::error::{SchemaError, SchemaResult};
use crate::field::{FieldGroup, SerializeNode};
use crate::gate::GateMask;
use crate::hash::schema_hash;

/// Largest payload a leaf may declare, in bytes.
pub const MAX_LEAF_CAPACITY: u16 = 1024;

/// Declarative schema tree, as written by entity-kind builder functions.
#[derive(Debug, Clone)]
pub enum NodeDef {
    Branch {
        gate: GateMask,
        children: Vec<NodeDef>,
    },
    Leaf(LeafDef),
}

/// Declaration of one field-group leaf.
#[derive(Debug, Clone)]
pub struct LeafDef {
    pub gate: GateMask,
    pub capacity_bytes: u16,
    pub group: FieldGroup,
    pub send_on_first_update: bool,
}

/// Declares a branch with its children in wire order.
#[must_use]
pub fn branch(gate: GateMask, children: Vec<NodeDef>) -> NodeDef {
    NodeDef::Branch { gate, children }
}

/// Declares a leaf carrying the field group `T`.
#[must_use]
pub fn leaf<T: SerializeNode>(gate: GateMask, capacity_bytes: u16) -> NodeDef {
    NodeDef::Leaf(LeafDef {
        gate,
        capacity_bytes,
        group: FieldGroup::of::<T>(),
        send_on_first_update: true,
    })
}

impl NodeDef {
    /// Marks a leaf as never sent in a client's first update.
    #[must_use]
    pub fn no_first_update(mut self) -> Self {
        if let Self::Leaf(def) = &mut self {
            def.send_on_first_update = false;
        }
        self
    }
}

/// Offset of a leaf within the leaf arena of every tree built from a schema.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeafSlot(u16);

impl LeafSlot {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a node within a schema's pre-order node arena.
pub type NodeIndex = usize;

/// Flattened schema node.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub gate: GateMask,
    pub depth: u16,
    pub kind: SchemaNodeKind,
}

#[derive(Debug, Clone)]
pub enum SchemaNodeKind {
    Branch { children: Vec<NodeIndex> },
    Leaf { slot: LeafSlot },
}

/// Static description of a leaf.
#[derive(Debug, Clone)]
pub struct LeafSpec {
    pub node: NodeIndex,
    pub gate: GateMask,
    pub capacity_bytes: u16,
    pub group: FieldGroup,
    pub send_on_first_update: bool,
}

impl LeafSpec {
    /// Capacity in bits.
    #[must_use]
    pub const fn capacity_bits(&self) -> usize {
        self.capacity_bytes as usize * 8
    }
}

/// Maps field-group types to the leaf slot that carries them.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    slots: HashMap<TypeId, LeafSlot>,
    names: HashMap<&'static str, LeafSlot>,
}

impl FieldRegistry {
    /// Slot of the leaf carrying `T`, or `None` if the schema lacks it.
    #[must_use]
    pub fn lookup<T: 'static>(&self) -> Option<LeafSlot> {
        self.lookup_id(TypeId::of::<T>())
    }

    #[must_use]
    pub fn lookup_id(&self, id: TypeId) -> Option<LeafSlot> {
        self.slots.get(&id).copied()
    }

    /// Slot of the leaf whose field group has the given name.
    #[must_use]
    pub fn lookup_name(&self, name: &str) -> Option<LeafSlot> {
        self.names.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Immutable schema for one entity kind.
///
/// Built once from a [`NodeDef`] tree: nodes are stored in pre-order (which
/// is also wire order), every leaf gets a [`LeafSlot`], and the
/// [`FieldRegistry`] is filled in the same walk.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: &'static str,
    nodes: Vec<SchemaNode>,
    leaves: Vec<LeafSpec>,
    registry: FieldRegistry,
    hash: u64,
}

impl EntitySchema {
    /// Flattens and validates a schema definition.
    pub fn new(name: &'static str, root: NodeDef) -> SchemaResult<Self> {
        if !matches!(root, NodeDef::Branch { .. }) {
            return Err(SchemaError::RootNotBranch { schema: name });
        }

        let mut schema = Self {
            name,
            nodes: Vec::new(),
            leaves: Vec::new(),
            registry: FieldRegistry::default(),
            hash: 0,
        };
        schema.push_node(root, 0)?;
        schema.hash = schema_hash(&schema);
        Ok(schema)
    }

    fn push_node(&mut self, def: NodeDef, depth: u16) -> SchemaResult<NodeIndex> {
        let index = self.nodes.len();
        match def {
            NodeDef::Branch { gate, children } => {
                self.nodes.push(SchemaNode {
                    gate,
                    depth,
                    kind: SchemaNodeKind::Branch {
                        children: Vec::with_capacity(children.len()),
                    },
                });
                let mut child_indices = Vec::with_capacity(children.len());
                for child in children {
                    child_indices.push(self.push_node(child, depth + 1)?);
                }
                self.nodes[index].kind = SchemaNodeKind::Branch {
                    children: child_indices,
                };
            }
            NodeDef::Leaf(def) => {
                if def.capacity_bytes == 0 || def.capacity_bytes > MAX_LEAF_CAPACITY {
                    return Err(SchemaError::InvalidCapacity {
                        group: def.group.name(),
                        capacity: def.capacity_bytes,
                    });
                }
                let slot = u16::try_from(self.leaves.len())
                    .map(LeafSlot)
                    .map_err(|_| SchemaError::TooManyLeaves {
                        schema: self.name,
                        count: self.leaves.len() + 1,
                    })?;
                if self
                    .registry
                    .slots
                    .insert(def.group.group_id(), slot)
                    .is_some()
                {
                    return Err(SchemaError::DuplicateFieldGroup {
                        schema: self.name,
                        group: def.group.name(),
                    });
                }
                self.registry.names.insert(def.group.name(), slot);
                self.nodes.push(SchemaNode {
                    gate: def.gate,
                    depth,
                    kind: SchemaNodeKind::Leaf { slot },
                });
                self.leaves.push(LeafSpec {
                    node: index,
                    gate: def.gate,
                    capacity_bytes: def.capacity_bytes,
                    group: def.group,
                    send_on_first_update: def.send_on_first_update,
                });
            }
        }
        Ok(index)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Root node index; always a branch.
    #[must_use]
    pub const fn root(&self) -> NodeIndex {
        0
    }

    /// All nodes in pre-order.
    #[must_use]
    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&SchemaNode> {
        self.nodes.get(index)
    }

    /// All leaves in slot order.
    #[must_use]
    pub fn leaves(&self) -> &[LeafSpec] {
        &self.leaves
    }

    #[must_use]
    pub fn leaf(&self, slot: LeafSlot) -> Option<&LeafSpec> {
        self.leaves.get(slot.index())
    }

    #[must_use]
    pub const fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Deterministic hash over the schema's shape.
    #[must_use]
    pub const fn hash(&self) -> u64 {
        self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Serializer;
    use crate::gate::masks::ALL;
    use bitstream::BitResult;

    macro_rules! probe {
        ($name:ident) => {
            #[derive(Debug, Clone, Default)]
            struct $name;

            impl SerializeNode for $name {
                const NAME: &'static str = stringify!($name);
                const DECODED: bool = false;

                fn serialize<S: Serializer>(&mut self, _s: &mut S) -> BitResult<()> {
                    Ok(())
                }
            }
        };
    }

    probe!(Creation);
    probe!(Health);
    probe!(Movement);

    fn sample() -> NodeDef {
        branch(
            GateMask::new(ALL, 0, 0),
            vec![
                branch(
                    GateMask::new(1, 0, 0),
                    vec![leaf::<Creation>(GateMask::new(1, 0, 0), 14)],
                ),
                leaf::<Health>(GateMask::new(ALL, ALL, 0), 57),
                leaf::<Movement>(GateMask::new(86, 86, 0), 2).no_first_update(),
            ],
        )
    }

    #[test]
    fn flattens_in_pre_order() {
        let schema = EntitySchema::new("Sample", sample()).unwrap();
        assert_eq!(schema.nodes().len(), 5);
        assert_eq!(schema.leaves().len(), 3);
        assert!(matches!(
            schema.nodes()[0].kind,
            SchemaNodeKind::Branch { ref children } if children == &[1, 3, 4]
        ));
        assert_eq!(schema.nodes()[2].depth, 2);
        assert_eq!(schema.leaves()[0].group.name(), "Creation");
        assert_eq!(schema.leaves()[2].node, 4);
        assert!(!schema.leaves()[2].send_on_first_update);
        assert_eq!(schema.leaves()[1].capacity_bits(), 456);
    }

    #[test]
    fn registry_resolves_declared_groups_only() {
        let schema = EntitySchema::new("Sample", sample()).unwrap();
        let registry = schema.registry();
        assert_eq!(registry.len(), 3);
        let slot = registry.lookup::<Health>().unwrap();
        assert_eq!(slot.index(), 1);
        assert_eq!(registry.lookup_name("Health"), Some(slot));
        assert_eq!(registry.lookup::<u32>(), None);
        // Offsets do not move for the lifetime of the schema.
        assert_eq!(registry.lookup::<Health>(), Some(slot));
    }

    #[test]
    fn rejects_duplicate_field_group() {
        let def = branch(
            GateMask::new(ALL, 0, 0),
            vec![
                leaf::<Health>(GateMask::new(ALL, 0, 0), 4),
                leaf::<Health>(GateMask::new(1, 0, 0), 4),
            ],
        );
        let err = EntitySchema::new("Dup", def).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateFieldGroup {
                schema: "Dup",
                group: "Health"
            }
        );
    }

    #[test]
    fn rejects_invalid_capacity() {
        for capacity in [0, MAX_LEAF_CAPACITY + 1] {
            let def = branch(
                GateMask::new(ALL, 0, 0),
                vec![leaf::<Health>(GateMask::new(ALL, 0, 0), capacity)],
            );
            let err = EntitySchema::new("Cap", def).unwrap_err();
            assert!(matches!(err, SchemaError::InvalidCapacity { .. }));
        }
    }

    #[test]
    fn rejects_leaf_root() {
        let err = EntitySchema::new("Bare", leaf::<Health>(GateMask::new(ALL, 0, 0), 4))
            .unwrap_err();
        assert_eq!(err, SchemaError::RootNotBranch { schema: "Bare" });
    }
}
