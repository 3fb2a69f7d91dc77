use dgflux::backend::{InterpreterBuilder, KernelError, NativeModuleBuilder, Platform};
use dgflux::face_group::FaceGroupBuilder;
use dgflux_cgen::{Block, Declarator, Expr, For, FunctionBody, FunctionDeclaration, Module, ModuleItem, Statement};

fn x(name: &str) -> Expr {
    Expr::ident(name)
}

/// A module whose `copy` function writes `value` to every face node slot of `out`.
fn fill_module(value_type: Option<&str>, value: Expr) -> Module {
    let mut module = Module::new();
    if let Some(value_type) = value_type {
        module.push(ModuleItem::Typedef(Declarator::value(value_type, "value_type")));
    }
    let declaration = FunctionDeclaration::new(
        Declarator::value("void", "copy"),
        vec![
            Declarator::value("face_group", "fg").constant().reference(),
            Declarator::value("numpy_array<value_type>", "out"),
            Declarator::value("numpy_array<value_type>", "input")
                .constant()
                .reference(),
        ],
    );
    let body: Block = vec![Statement::For(For {
        counter: "i".to_string(),
        start: Expr::Int(0),
        end: x("fg").method("face_length", vec![]),
        body: vec![Statement::Assign(x("out").index(x("i")), value)]
            .into_iter()
            .collect(),
    })]
    .into_iter()
    .collect();
    module.add_function(FunctionBody::new(declaration, body));
    module
}

#[test]
fn interpreted_kernels_execute_the_module() {
    let module = fill_module(Some("double"), Expr::Real(2.0) * x("input").index(x("i")) + Expr::Int(1));
    let kernel = InterpreterBuilder
        .build(&module, &Platform::default(), "copy")
        .unwrap();

    let group = FaceGroupBuilder::new(3, 1).build();
    let input = [1.0, 2.0, 3.0, 4.0];
    let mut out = [0.0; 4];
    kernel
        .call(&group, &mut [&mut out[..]], &[&input[..]])
        .unwrap();
    assert_eq!(out, [3.0, 5.0, 7.0, 0.0]);
}

#[test]
fn single_precision_kernels_round_stored_values() {
    let module = fill_module(Some("float"), x("input").index(x("i")));
    let kernel = InterpreterBuilder
        .build(&module, &Platform::default(), "copy")
        .unwrap();

    let group = FaceGroupBuilder::new(1, 1).build();
    let mut out = [0.0];
    kernel
        .call(&group, &mut [&mut out[..]], &[&[0.1][..]])
        .unwrap();
    assert_eq!(out[0], 0.1f32 as f64);
    assert_ne!(out[0], 0.1);
}

#[test]
fn build_errors_carry_source_and_diagnostics() {
    let module = fill_module(None, Expr::call("sqrt", vec![x("missing")]));
    let err = InterpreterBuilder
        .build(&module, &Platform::default(), "copy")
        .err()
        .unwrap();

    assert_eq!(err.generated_source, module.to_string());
    assert_eq!(
        err.diagnostics,
        vec![
            "`value_type` is not declared".to_string(),
            "call to unknown function `sqrt`".to_string(),
            "use of undeclared identifier `missing`".to_string(),
        ]
    );
    assert!(err.to_string().contains("--- generated source ---"));
}

#[test]
fn missing_entry_points_fail_to_build() {
    let module = fill_module(Some("double"), Expr::Int(0));
    let err = InterpreterBuilder
        .build(&module, &Platform::default(), "gather_flux")
        .err()
        .unwrap();
    assert_eq!(err.diagnostics, vec!["no function named `gather_flux`".to_string()]);
}

#[test]
fn verbatim_statements_are_rejected() {
    let mut module = fill_module(Some("double"), Expr::Int(0));
    let mut function = module.function("copy").unwrap().clone();
    function.body.push(Statement::Raw("abort()".to_string()));
    module.add_function(FunctionBody::new(
        FunctionDeclaration::new(Declarator::value("void", "raw"), function.declaration.params.clone()),
        function.body,
    ));

    let err = InterpreterBuilder
        .build(&module, &Platform::default(), "raw")
        .err()
        .unwrap();
    assert_eq!(err.diagnostics.len(), 1);
    assert!(err.diagnostics[0].contains("abort()"));
}

#[test]
fn kernels_check_their_arguments() {
    let module = fill_module(Some("double"), x("input").index(x("i")));
    let kernel = InterpreterBuilder
        .build(&module, &Platform::default(), "copy")
        .unwrap();
    let group = FaceGroupBuilder::new(2, 1).build();

    let mut out = [0.0; 2];
    let err = kernel.call(&group, &mut [&mut out[..]], &[]).unwrap_err();
    assert_eq!(
        err,
        KernelError::ArgumentCount {
            expected_outputs: 1,
            expected_inputs: 1,
            outputs: 1,
            inputs: 0,
        }
    );

    let err = kernel
        .call(&group, &mut [&mut out[..]], &[&[1.0][..]])
        .unwrap_err();
    assert!(matches!(err, KernelError::OutOfBounds { index: 1, len: 1, .. }));
}
