//! Storage that mixin instances contribute to their target aggregate.

use kiln_ir::Name;
use thiserror::Error;

use crate::engine::Engine;
use crate::ids::InstanceId;
use crate::instance::FieldLayout;


/// A field placed in an aggregate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PlacedField {
    pub name: Name,
    pub offset: u32,
    pub size: u32,
}

/// Layout arithmetic left the `u32` offset range.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum LayoutError {
    #[error("field #{index} of {size} bytes does not fit in the aggregate")]
    FieldTooLarge { index: usize, size: u32 },
    #[error("aggregate of {size} bytes cannot be padded to alignment {alignment}")]
    PaddingOverflow { size: u32, alignment: u32 },
}

/// Running layout of a struct or union while its members are placed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AggregateLayout {
    /// Next free offset. Unused by unions.
    pub offset: u32,
    pub size: u32,
    pub alignment: u32,
    pub is_union: bool,
    pub fields: Vec<PlacedField>,
}

impl AggregateLayout {
    pub fn new_struct() -> Self {
        AggregateLayout {
            offset: 0,
            size: 0,
            alignment: 1,
            is_union: false,
            fields: Vec::new(),
        }
    }

    pub fn new_union() -> Self {
        AggregateLayout {
            is_union: true,
            ..Self::new_struct()
        }
    }

    /// Place one field and return its offset. The layout is unchanged on
    /// error.
    pub fn place(&mut self, name: Name, field: FieldLayout) -> Result<u32, LayoutError> {
        let too_large = LayoutError::FieldTooLarge {
            index: self.fields.len(),
            size: field.size,
        };
        let align = field.align.max(1);
        let offset = if self.is_union {
            0
        } else {
            self.offset.checked_next_multiple_of(align).ok_or(too_large)?
        };
        let end = offset.checked_add(field.size).ok_or(too_large)?;
        if !self.is_union {
            self.offset = end;
        }
        self.size = self.size.max(end);
        self.alignment = self.alignment.max(align);
        self.fields.push(PlacedField {
            name,
            offset,
            size: field.size,
        });
        Ok(offset)
    }

    /// Size padded to the aggregate's alignment.
    pub fn padded_size(&self) -> Result<u32, LayoutError> {
        let alignment = self.alignment.max(1);
        self.size
            .checked_next_multiple_of(alignment)
            .ok_or(LayoutError::PaddingOverflow {
                size: self.size,
                alignment,
            })
    }
}

impl Default for AggregateLayout {
    fn default() -> Self {
        Self::new_struct()
    }
}

impl Engine {
    /// Place the field members of mixin `id` into `layout`, in declaration
    /// order. Instances without members contribute nothing.
    ///
    /// Stops at the first field that overflows the aggregate; fields placed
    /// before it stay in `layout`.
    pub fn set_field_offset(
        &self,
        id: InstanceId,
        layout: &mut AggregateLayout,
    ) -> Result<(), LayoutError> {
        let Some(members) = self.instance(id).members() else {
            return Ok(());
        };
        for (member, field) in members.fields() {
            let offset = layout.place(member.name, field).inspect_err(|err| {
                tracing::debug!(instance = id.raw(), %err, "mixin layout overflow");
            })?;
            tracing::trace!(instance = id.raw(), offset, size = field.size, "mixin field placed");
        }
        Ok(())
    }

    /// Whether any field member of `id` holds references.
    pub fn has_pointers(&self, id: InstanceId) -> bool {
        self.instance(id)
            .members()
            .is_some_and(|members| members.fields().any(|(_, field)| field.has_pointers))
    }
}
