//! Marking of field reads and writes.
//!
//! Fields are read by `getfield` and `getstatic` and written by `putfield` and `putstatic`.
//! A method handle reads or writes its field according to its reference kind. A field reached
//! through reflection may be accessed either way, so it is marked both read and written.

use tracing::trace;

use crate::{
    analysis::{
        markers::{ClassMarker, MarkingContext},
        resolve,
    },
    classfile::{Constant, Opcode, ProgramClass, ReferenceKind, Token},
    Result,
};

/// Marks the fields each program class reads and writes.
pub struct ReadWriteFieldMarker;

impl ReadWriteFieldMarker {
    /// Marks `field` as read.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingFacts`] if the field has no facts attached.
    pub fn mark_read(&self, context: &MarkingContext<'_>, field: Token) -> Result<()> {
        context.store.update_field(field, |facts| facts.set_read())?;
        Ok(())
    }

    /// Marks `field` as written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingFacts`] if the field has no facts attached.
    pub fn mark_written(&self, context: &MarkingContext<'_>, field: Token) -> Result<()> {
        context.store.update_field(field, |facts| facts.set_written())?;
        Ok(())
    }

    fn mark_instructions(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        for code in class.methods.iter().filter_map(|method| method.code.as_ref()) {
            for instruction in &code.instructions {
                let write = match instruction.opcode {
                    Opcode::Getfield | Opcode::Getstatic => false,
                    Opcode::Putfield | Opcode::Putstatic => true,
                    _ => continue,
                };
                let Some(index) = instruction.constant_index() else {
                    continue;
                };
                let field = resolve::referenced_member(class, index)?;
                if write {
                    self.mark_written(context, field)?;
                } else {
                    self.mark_read(context, field)?;
                }
            }
        }
        Ok(())
    }

    fn mark_constants(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        for (_, constant) in class.constant_pool.iter() {
            match constant {
                Constant::String(string) => {
                    let Some(member) = string.referenced_member else {
                        continue;
                    };
                    if !context.pool.is_method(member) {
                        trace!(field = %member, from = %class.name, "reflected field");
                        self.mark_read(context, member)?;
                        self.mark_written(context, member)?;
                    }
                }
                Constant::MethodHandle(handle) if handle.kind.is_field() => {
                    let field = resolve::referenced_member(class, handle.reference_index)?;
                    match handle.kind {
                        ReferenceKind::GetField | ReferenceKind::GetStatic => {
                            self.mark_read(context, field)?;
                        }
                        _ => self.mark_written(context, field)?,
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl ClassMarker for ReadWriteFieldMarker {
    fn mark_class(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        self.mark_instructions(context, class)?;
        self.mark_constants(context, class)
    }

    fn name(&self) -> &'static str {
        "fields"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            config::AnalysisConfig,
            info::{FactStore, FieldInfo},
        },
        classfile::{AccessFlags, ClassBuilder, ReflectionTarget},
        test::factories::{field_token, linked_pool},
    };

    #[test]
    fn test_reads_and_writes() {
        let pool = linked_pool(vec![ClassBuilder::new("app/Counter")
            .field("count", "I", AccessFlags::PRIVATE)
            .field("total", "J", AccessFlags::PRIVATE | AccessFlags::STATIC)
            .field("unused", "I", AccessFlags::PRIVATE)
            .field("viaHandle", "I", AccessFlags::PRIVATE | AccessFlags::STATIC)
            .field("byName", "Ljava/lang/Object;", AccessFlags::PRIVATE)
            .method("bump", "()V", AccessFlags::PUBLIC, |code| {
                code.aload(0)
                    .dup()
                    .getfield("app/Counter", "count", "I")
                    .push_int(1)
                    .op(Opcode::Iadd)
                    .putfield("app/Counter", "count", "I")
                    .op(Opcode::Lconst1)
                    .putstatic("app/Counter", "total", "J")
                    .op(Opcode::Return);
                Ok(())
            })
            .with_constants(|constants| {
                let reference = constants.fieldref("app/Counter", "viaHandle", "I");
                constants.method_handle(ReferenceKind::PutStatic, reference);
                constants.reflected_string(
                    "byName",
                    ReflectionTarget {
                        class_name: "app/Counter".to_string(),
                        member_name: Some("byName".to_string()),
                        descriptor: Some("Ljava/lang/Object;".to_string()),
                    },
                );
            })
            .build()
            .unwrap()]);
        let store = FactStore::initialize(&pool, false).unwrap();
        let config = AnalysisConfig::sequential();
        let context = MarkingContext::new(&pool, &store, &config);
        for class in pool.program_classes() {
            ReadWriteFieldMarker.mark_class(&context, class).unwrap();
        }

        let access = |name: &str| {
            let facts = store.field(field_token(&pool, "app/Counter", name)).unwrap();
            (facts.is_read(), facts.is_written())
        };
        assert_eq!(access("count"), (true, true));
        assert_eq!(access("total"), (false, true));
        assert_eq!(access("unused"), (false, false));
        assert_eq!(access("viaHandle"), (false, true));
        assert_eq!(access("byName"), (true, true));
    }
}
