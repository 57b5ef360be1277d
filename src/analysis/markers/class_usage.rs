//! Marking of instantiated, caught and `.class`-loaded classes.

use tracing::trace;

use crate::{
    analysis::{
        markers::{ClassMarker, MarkingContext},
        resolve,
    },
    classfile::{Code, Opcode, ProgramClass},
    Result,
};

/// Marks how the classes referenced by method bodies are used at run time.
///
/// - `new` marks its class instantiated
/// - `ldc` and `ldc_w` of a class constant mark the class dot-classed
/// - every exception handler marks its catch type caught
pub struct ClassUsageMarker;

impl ClassUsageMarker {
    fn mark_code(
        &self,
        context: &MarkingContext<'_>,
        class: &ProgramClass,
        code: &Code,
    ) -> Result<()> {
        for instruction in &code.instructions {
            let Some(index) = instruction.constant_index() else {
                continue;
            };
            match instruction.opcode {
                Opcode::New => {
                    if let Some(created) = resolve::referenced_class(class, index)? {
                        trace!(class = %created, from = %class.name, "instantiated");
                        context
                            .store
                            .update_class(created, |facts| facts.set_instantiated())?;
                    }
                }
                Opcode::Ldc | Opcode::LdcW => {
                    if let Some(loaded) = resolve::loaded_class(class, index)? {
                        context
                            .store
                            .update_class(loaded, |facts| facts.set_dot_classed())?;
                    }
                }
                _ => {}
            }
        }

        for handler in &code.exception_table {
            if handler.catch_type == 0 {
                continue;
            }
            if let Some(caught) = resolve::referenced_class(class, handler.catch_type)? {
                context
                    .store
                    .update_class(caught, |facts| facts.set_caught())?;
            }
        }
        Ok(())
    }
}

impl ClassMarker for ClassUsageMarker {
    fn mark_class(&self, context: &MarkingContext<'_>, class: &ProgramClass) -> Result<()> {
        for code in class.methods.iter().filter_map(|method| method.code.as_ref()) {
            self.mark_code(context, class, code)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "class usage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            config::AnalysisConfig,
            info::{ClassInfo, FactStore},
        },
        classfile::{AccessFlags, ClassBuilder},
        test::factories::linked_pool,
    };

    #[test]
    fn test_class_usage() {
        let pool = linked_pool(vec![
            ClassBuilder::new("app/Widget").build().unwrap(),
            ClassBuilder::new("app/Failure").build().unwrap(),
            ClassBuilder::new("app/Token").build().unwrap(),
            ClassBuilder::new("app/Idle").build().unwrap(),
            ClassBuilder::new("app/Factory")
                .method("create", "()Ljava/lang/Object;", AccessFlags::STATIC, |code| {
                    let (start, end) = (code.new_label(), code.new_label());
                    let handler = code.new_label();
                    code.place(start)
                        .new_instance("app/Widget")
                        .place(end)
                        .op(Opcode::Areturn)
                        .place(handler)
                        .ldc_class("app/Token")
                        .op(Opcode::Areturn)
                        .try_catch(start, end, handler, Some("app/Failure"))
                        .ldc_string("text")
                        .op(Opcode::Areturn);
                    Ok(())
                })
                .build()
                .unwrap(),
        ]);
        let store = FactStore::initialize(&pool, false).unwrap();
        let config = AnalysisConfig::sequential();
        let context = MarkingContext::new(&pool, &store, &config);
        for class in pool.program_classes() {
            ClassUsageMarker.mark_class(&context, class).unwrap();
        }

        let facts = |name: &str| {
            let facts = store.class(pool.token_of(name).unwrap()).unwrap();
            (facts.is_instantiated(), facts.is_dot_classed(), facts.is_caught())
        };
        assert_eq!(facts("app/Widget"), (true, false, false));
        assert_eq!(facts("app/Token"), (false, true, false));
        assert_eq!(facts("app/Failure"), (false, false, true));
        assert_eq!(facts("app/Idle"), (false, false, false));
    }
}
