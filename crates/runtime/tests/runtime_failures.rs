mod runtime_failures {
    use quill_bytecode::{FunctionInfo, Op, ProgramBuilder};
    use quill_runtime::{ExecutionState, OutputCapture, QuillVm, QuillVmSettings};
    use std::rc::Rc;

    fn run_program(build: impl FnOnce(&mut ProgramBuilder)) -> (i32, String) {
        let mut builder = ProgramBuilder::default();
        build(&mut builder);

        let (mut vm, capture) = OutputCapture::make_vm_with_output_capture();
        vm.prepare(Rc::new(builder.build()), &[]).unwrap();
        let exit_code = vm.run();
        assert_eq!(*vm.execution_state(), ExecutionState::Faulted);
        (exit_code, capture.captured_output())
    }

    fn check_failure(build: impl FnOnce(&mut ProgramBuilder), expected_message: &str) {
        let (exit_code, output) = run_program(build);
        assert_eq!(exit_code, 1, "stderr: {output}");
        assert!(
            output.contains(expected_message),
            "expected '{expected_message}' in '{output}'"
        );
    }

    fn load_int(b: &mut ProgramBuilder, n: i64) {
        let constant = b.add_i64(n).unwrap();
        b.push_load_const(constant);
    }

    fn load_str(b: &mut ProgramBuilder, s: &str) {
        let constant = b.add_string(s).unwrap();
        b.push_load_const(constant);
    }

    fn load_name(b: &mut ProgramBuilder, name: &str) {
        let name = b.add_string(name).unwrap();
        b.push_op_index(Op::LoadName, name);
    }

    fn store_name(b: &mut ProgramBuilder, name: &str) {
        let name = b.add_string(name).unwrap();
        b.push_op_index(Op::StoreName, name);
    }

    fn attr_call(b: &mut ProgramBuilder, name: &str, arg_count: u8) {
        let name = b.add_string(name).unwrap();
        b.push_attr_call(name, arg_count);
    }

    #[test]
    fn division_by_zero() {
        check_failure(
            |b| {
                load_int(b, 1);
                load_int(b, 0);
                b.push_op(Op::Divide);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);
            },
            "ArithError: division by zero",
        );
    }

    #[test]
    fn mismatched_operand_kinds() {
        check_failure(
            |b| {
                load_int(b, 1);
                load_str(b, "x");
                b.push_op(Op::Add);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);
            },
            "TypeError: unable to perform operation '+' with 'number' and 'string'",
        );
    }

    #[test]
    fn list_index_out_of_range() {
        check_failure(
            |b| {
                load_int(b, 1);
                b.push_op_var(Op::MakeList, 1);
                load_int(b, 5);
                b.push_op(Op::IndexGet);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);
            },
            "IndexError",
        );
    }

    #[test]
    fn negative_list_index_past_the_front() {
        // a[-2] on a one-element list
        check_failure(
            |b| {
                load_int(b, 1);
                b.push_op_var(Op::MakeList, 1);
                load_int(b, -2);
                b.push_op(Op::IndexGet);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);
            },
            "IndexError",
        );
    }

    #[test]
    fn missing_map_key() {
        check_failure(
            |b| {
                b.push_op_var(Op::MakeMap, 0);
                load_int(b, 1);
                b.push_op(Op::IndexGet);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);
            },
            "KeyError",
        );
    }

    #[test]
    fn unhashable_map_key() {
        // {} with a list key
        check_failure(
            |b| {
                b.push_op_var(Op::MakeMap, 0);
                b.push_op_var(Op::MakeList, 0);
                b.push_op(Op::IndexGet);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);
            },
            "TypeError: only hashable values can be used as keys",
        );
    }

    #[test]
    fn unknown_attribute() {
        check_failure(
            |b| {
                load_int(b, 5);
                attr_call(b, "frobnicate", 0);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);
            },
            "AttributeError",
        );
    }

    #[test]
    fn unresolved_identifier() {
        check_failure(
            |b| {
                load_name(b, "missing");
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);
            },
            "NameError: undefined identifier 'missing'",
        );
    }

    #[test]
    fn wrong_argument_count() {
        // func id(x) { return x }; id()
        check_failure(
            |b| {
                let x = b.add_string("x").unwrap();

                b.push_op_var(Op::MakeFunction, 0);
                store_name(b, "id");
                load_name(b, "id");
                b.push_op_u8(Op::Call, 0);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);

                let body_ip = b.ip();
                load_name(b, "x");
                b.push_op(Op::Return);

                b.add_function(FunctionInfo {
                    ip: body_ip,
                    arity: 1,
                    params: vec![x],
                    captures: vec![],
                });
            },
            "ArityError",
        );
    }

    #[test]
    fn calling_a_number() {
        check_failure(
            |b| {
                load_int(b, 5);
                b.push_op_u8(Op::Call, 0);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);
            },
            "TypeError: a value of type 'number' isn't callable",
        );
    }

    #[test]
    fn unbounded_recursion_overflows_the_call_stack() {
        // func f() { return f() }; f()
        check_failure(
            |b| {
                b.push_op_var(Op::MakeFunction, 0);
                store_name(b, "f");
                load_name(b, "f");
                b.push_op_u8(Op::Call, 0);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);

                let body_ip = b.ip();
                load_name(b, "f");
                b.push_op_u8(Op::Call, 0);
                b.push_op(Op::Return);

                b.add_function(FunctionInfo {
                    ip: body_ip,
                    arity: 0,
                    params: vec![],
                    captures: vec![],
                });
            },
            "StackOverflow",
        );
    }

    #[test]
    fn uncaught_raise() {
        let (exit_code, output) = run_program(|b| {
            load_str(b, "boom");
            b.push_op(Op::Raise);
            b.push_op(Op::ReturnNone);
        });
        assert_eq!(exit_code, 1);
        assert!(output.contains("RuntimeError: boom"));
    }

    #[test]
    fn adding_an_unhashable_value_to_a_set_is_a_type_error() {
        // {1}.add([]) - unhashable element
        check_failure(
            |b| {
                load_int(b, 1);
                b.push_op_var(Op::MakeSet, 1);
                b.push_op_var(Op::MakeList, 0);
                attr_call(b, "add", 1);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);
            },
            "TypeError: only hashable values can be used as keys",
        );
    }

    #[test]
    fn allocation_errors_are_fatal_and_uncatchable() {
        // keep = []; try { loop: keep.append([]) } catch { println("caught") }
        let mut builder = ProgramBuilder::default();
        let b = &mut builder;

        b.push_op_var(Op::MakeList, 0);
        store_name(b, "keep");

        let catch = b.push_jump(Op::TryStart);
        let loop_start = b.ip();
        load_name(b, "keep");
        b.push_op_var(Op::MakeList, 0);
        attr_call(b, "append", 1);
        b.push_op(Op::Pop);
        b.push_jump_back(loop_start).unwrap();

        b.patch_jump_to_here(catch).unwrap();
        load_name(b, "println");
        load_str(b, "caught");
        b.push_op_u8(Op::Call, 1);
        b.push_op(Op::Pop);
        b.push_op(Op::ReturnNone);

        let capture = OutputCapture::default();
        let mut vm = QuillVm::with_settings(QuillVmSettings {
            stdout: Rc::new(capture.clone()),
            stderr: Rc::new(capture.clone()),
            heap_limit: 16,
            ..Default::default()
        });
        vm.prepare(Rc::new(builder.build()), &[]).unwrap();

        let exit_code = vm.run();
        assert_eq!(exit_code, 2);
        assert_eq!(*vm.execution_state(), ExecutionState::Faulted);

        let output = capture.captured_output();
        assert!(output.contains("AllocationError"));
        assert!(!output.contains("caught"));
    }

    #[test]
    fn errors_in_a_callee_unwind_to_the_main_frame() {
        // func f() { return 1 / 0 }; f()
        check_failure(
            |b| {
                b.push_op_var(Op::MakeFunction, 0);
                store_name(b, "f");
                load_name(b, "f");
                b.push_op_u8(Op::Call, 0);
                b.push_op(Op::Pop);
                b.push_op(Op::ReturnNone);

                let body_ip = b.ip();
                load_int(b, 1);
                load_int(b, 0);
                b.push_op(Op::Divide);
                b.push_op(Op::Return);

                b.add_function(FunctionInfo {
                    ip: body_ip,
                    arity: 0,
                    params: vec![],
                    captures: vec![],
                });
            },
            "ArithError",
        );
    }

    #[test]
    fn caught_errors_leave_the_vm_healthy() {
        // try { 1 + "x" } catch {}; println handled separately - expect exit 0
        let mut builder = ProgramBuilder::default();
        let b = &mut builder;

        let catch = b.push_jump(Op::TryStart);
        load_int(b, 1);
        load_str(b, "x");
        b.push_op(Op::Add);
        b.push_op(Op::Pop);
        b.push_op(Op::TryEnd);
        let done = b.push_jump(Op::Jump);
        b.patch_jump_to_here(catch).unwrap();
        b.patch_jump_to_here(done).unwrap();
        load_name(b, "println");
        load_str(b, "recovered");
        b.push_op_u8(Op::Call, 1);
        b.push_op(Op::Pop);
        b.push_op(Op::ReturnNone);

        let (mut vm, capture) = OutputCapture::make_vm_with_output_capture();
        vm.prepare(Rc::new(builder.build()), &[]).unwrap();
        assert_eq!(vm.run(), 0);
        assert_eq!(*vm.execution_state(), ExecutionState::Halted);
        assert_eq!(capture.captured_output(), "recovered \n");
    }
}
