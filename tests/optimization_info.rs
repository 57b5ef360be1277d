//! End-to-end tests of the optimization facts through the public API.

use classfacts::{
    analysis::{
        AnalysisConfig, ClassInfo, ClassMarker, FactStore, InstanceofMarker, LibraryMethodFacts,
        MarkingContext, MethodInfo, OptimizationInfoAnalyzer, ParameterUsageMarker,
        ProgramMethodFacts, ReferenceValue, SideEffectInstructionChecker, Value,
    },
    classfile::{AccessFlags, ClassBuilder, ClassPool, Instruction, Opcode, Token},
    Error,
};

fn program() -> ClassPool {
    let statics = AccessFlags::PUBLIC | AccessFlags::STATIC;
    let mut pool = ClassPool::new();
    pool.add(
        ClassBuilder::new("java/lang/Object")
            .library()
            .declare_method("<init>", "()V", AccessFlags::PUBLIC)
            .build()
            .unwrap(),
    )
    .unwrap();
    pool.add(
        ClassBuilder::new("lib/Console")
            .library()
            .declare_method("print", "()V", statics)
            .build()
            .unwrap(),
    )
    .unwrap();
    pool.add(ClassBuilder::new("app/Shape").build().unwrap())
        .unwrap();
    pool.add(
        ClassBuilder::new("app/Main")
            .method("isShape", "(Ljava/lang/Object;)Z", statics, |code| {
                code.aload(0).instanceof("app/Shape").op(Opcode::Ireturn);
                Ok(())
            })
            .method("takesLong", "(J)V", AccessFlags::PUBLIC, |code| {
                code.lload(1).op(Opcode::Pop2).op(Opcode::Return);
                Ok(())
            })
            .method("onlyThis", "(J)V", AccessFlags::PUBLIC, |code| {
                code.aload(0).op(Opcode::Pop).op(Opcode::Return);
                Ok(())
            })
            .method("shouts", "()V", statics, |code| {
                code.invokestatic("lib/Console", "print", "()V")
                    .op(Opcode::Return);
                Ok(())
            })
            .method("sum", "(II)I", statics, |code| {
                code.iload(0).iload(1).op(Opcode::Iadd).op(Opcode::Ireturn);
                Ok(())
            })
            .build()
            .unwrap(),
    )
    .unwrap();
    pool.link().unwrap();
    pool
}

fn main_method(pool: &ClassPool, name: &str) -> Token {
    pool.class_by_name("app/Main")
        .unwrap()
        .methods
        .iter()
        .find(|method| method.name == name)
        .unwrap()
        .token
}

fn analyze(pool: &ClassPool) -> FactStore {
    OptimizationInfoAnalyzer::new(AnalysisConfig::sequential())
        .analyze(pool)
        .unwrap()
}

#[test]
fn stronger_effect_facts_imply_weaker_ones() {
    let pool = program();
    let store = analyze(&pool);

    for (_, method) in pool.methods() {
        let facts = store.method(method.token).unwrap();
        if facts.has_no_side_effects() {
            assert!(facts.has_no_external_side_effects(), "{}", method.name);
        }
        if facts.has_no_external_side_effects() {
            assert!(facts.has_no_escaping_parameters(), "{}", method.name);
        }
    }

    let mut fresh = ProgramMethodFacts::new(Token::method(1), vec![1]);
    fresh.set_no_side_effects();
    assert!(fresh.has_no_external_side_effects());
    assert!(fresh.has_no_escaping_parameters());
}

#[test]
fn slots_beyond_the_bitmask_read_as_set() {
    let pool = program();
    let store = analyze(&pool);

    for (_, method) in pool.methods() {
        let facts = store.method(method.token).unwrap();
        assert!(facts.is_parameter_used(64));
        assert!(facts.has_parameter_escaped(100));
    }
}

#[test]
fn analysis_is_idempotent() {
    let pool = program();
    let first = analyze(&pool);
    let second = analyze(&pool);

    for (_, method) in pool.methods() {
        assert_eq!(
            *first.method(method.token).unwrap(),
            *second.method(method.token).unwrap(),
            "{}",
            method.name
        );
    }
    for class in pool.classes() {
        assert_eq!(
            *first.class(class.token).unwrap(),
            *second.class(class.token).unwrap(),
        );
    }
}

#[test]
fn generalized_values_only_widen() {
    let mut facts = ProgramMethodFacts::new(Token::method(1), vec![1]);

    facts.generalize_return_value(Value::Integer(Some(1))).unwrap();
    facts.generalize_return_value(Value::Integer(Some(1))).unwrap();
    assert_eq!(facts.return_value(), Some(Value::Integer(Some(1))));

    facts.generalize_return_value(Value::Integer(Some(2))).unwrap();
    assert_eq!(facts.return_value(), Some(Value::Integer(None)));

    facts.generalize_return_value(Value::Integer(Some(1))).unwrap();
    assert_eq!(facts.return_value(), Some(Value::Integer(None)));

    let err = facts
        .generalize_return_value(Value::Reference(ReferenceValue::null()))
        .unwrap_err();
    assert!(matches!(err, Error::IncompatibleValues { .. }));
}

#[test]
fn classifier_follows_policy() {
    let pool = program();
    let store = analyze(&pool);
    let class = pool.class_by_name("app/Main").unwrap();

    let cases = [
        (Opcode::Nop, false, false),
        (Opcode::Iadd, false, false),
        (Opcode::Athrow, true, true),
        (Opcode::Monitorenter, true, true),
        (Opcode::Ireturn, false, true),
        (Opcode::Iastore, false, true),
        (Opcode::Idiv, false, true),
        (Opcode::Arraylength, false, true),
    ];
    for (opcode, relaxed, strict) in cases {
        let mut checker = SideEffectInstructionChecker::new(false, false, false);
        let result = checker
            .has_side_effects(&pool, &store, class, &Instruction::simple(opcode))
            .unwrap();
        assert_eq!(result, relaxed, "{opcode:?} relaxed");
        assert_eq!(checker.last_result(), relaxed);

        let mut checker = SideEffectInstructionChecker::new(true, true, true);
        let result = checker
            .has_side_effects(&pool, &store, class, &Instruction::simple(opcode))
            .unwrap();
        assert_eq!(result, strict, "{opcode:?} strict");
    }
}

#[test]
fn analysis_separates_pure_and_effectful_methods() {
    let pool = program();
    let store = analyze(&pool);

    let sum = store.method(main_method(&pool, "sum")).unwrap();
    assert!(!sum.has_side_effects());
    assert_eq!(sum.used_parameters(), 0b11);

    let shouts = store.method(main_method(&pool, "shouts")).unwrap();
    assert!(shouts.has_side_effects());
    assert!(!shouts.has_no_side_effects());
}

#[test]
fn merge_only_adds_facts() {
    let mut target = ProgramMethodFacts::new(Token::method(1), vec![1]);
    target.set_catches_exceptions();

    let mut overrider = ProgramMethodFacts::new(Token::method(2), vec![1]);
    overrider.set_branches_backward();
    overrider.set_accesses_private_code();

    target.merge(&overrider);
    assert!(target.catches_exceptions());
    assert!(target.branches_backward());
    assert!(target.accesses_private_code());
    assert!(!target.has_synchronized_block());

    let quiet = ProgramMethodFacts::new(Token::method(3), vec![1]);
    target.merge(&quiet);
    assert!(target.catches_exceptions());
    assert!(target.branches_backward());
}

#[test]
fn library_facts_are_conservative_and_fresh_facts_are_optimistic() {
    let library = LibraryMethodFacts::new(vec![1, 2]);
    assert!(library.has_side_effects());
    assert!(!library.has_no_side_effects());
    assert!(library.accesses_private_code());
    assert!(library.catches_exceptions());
    assert!(library.is_parameter_used(0));
    assert_eq!(library.invocation_count(), u32::MAX);

    let fresh = ProgramMethodFacts::new(Token::method(1), vec![1, 2]);
    assert!(!fresh.has_side_effects());
    assert!(!fresh.has_no_side_effects());
    assert!(!fresh.accesses_private_code());
    assert!(!fresh.catches_exceptions());
    assert!(!fresh.is_parameter_used(0));
    assert_eq!(fresh.invocation_count(), 0);

    let pool = program();
    let store = analyze(&pool);
    let class = pool.class_by_name("lib/Console").unwrap();
    let print = class.method("print", "()V").unwrap();
    assert!(store.method(print.token).unwrap().is_library());
    assert!(store.method(print.token).unwrap().has_side_effects());
}

#[test]
fn instanceof_marks_the_tested_class() {
    let pool = program();
    let config = AnalysisConfig::sequential();
    let store = FactStore::initialize(&pool, false).unwrap();
    let shape = pool.token_of("app/Shape").unwrap();
    assert!(!store.class(shape).unwrap().is_instanceofed());

    let context = MarkingContext::new(&pool, &store, &config);
    let main = pool.class_by_name("app/Main").unwrap();
    InstanceofMarker.mark_class(&context, main).unwrap();
    InstanceofMarker.mark_class(&context, main).unwrap();

    assert!(store.class(shape).unwrap().is_instanceofed());
    let main_token = pool.token_of("app/Main").unwrap();
    assert!(!store.class(main_token).unwrap().is_instanceofed());
}

#[test]
fn wide_parameter_after_receiver_takes_two_slots() {
    let pool = program();
    let store = analyze(&pool);
    let marker = ParameterUsageMarker;

    let takes_long = main_method(&pool, "takesLong");
    assert_eq!(marker.used_parameters(&store, takes_long).unwrap(), 0b110);
    assert!(!store.method(takes_long).unwrap().is_parameter_used(0));

    let only_this = main_method(&pool, "onlyThis");
    assert_eq!(marker.used_parameters(&store, only_this).unwrap(), 0b1);
}

#[test]
fn writes_to_fields_read_outside_the_program_are_side_effects() {
    let statics = AccessFlags::PUBLIC | AccessFlags::STATIC;
    let mut pool = ClassPool::new();
    pool.add(ClassBuilder::new("java/lang/Object").library().build().unwrap())
        .unwrap();
    pool.add(
        ClassBuilder::new("app/Config")
            .field("flag", "Z", AccessFlags::PRIVATE | AccessFlags::STATIC)
            .field(
                "shared",
                "Z",
                AccessFlags::PRIVATE | AccessFlags::STATIC | AccessFlags::VOLATILE,
            )
            .method("enable", "()V", statics, |code| {
                code.push_int(1)
                    .putstatic("app/Config", "flag", "Z")
                    .op(Opcode::Return);
                Ok(())
            })
            .method("share", "()V", statics, |code| {
                code.push_int(1)
                    .putstatic("app/Config", "shared", "Z")
                    .op(Opcode::Return);
                Ok(())
            })
            .build()
            .unwrap(),
    )
    .unwrap();
    pool.link().unwrap();

    let config = pool.class_by_name("app/Config").unwrap();
    let flag = config.field("flag", "Z").unwrap().token;
    let analyzer = OptimizationInfoAnalyzer::new(AnalysisConfig {
        parallel: false,
        ..AnalysisConfig::aggressive()
    });
    let store = analyzer
        .analyze_with(&pool, |store| store.keep_field(flag))
        .unwrap();

    let enable = config.method("enable", "()V").unwrap();
    let share = config.method("share", "()V").unwrap();
    assert!(store.method(enable.token).unwrap().has_side_effects());
    assert!(store.method(share.token).unwrap().has_side_effects());
}
