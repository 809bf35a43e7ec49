//! The Quill virtual machine: a stack-based interpreter for compiled [Program]s

use crate::{
    CallContext, Error, ErrorKind, Heap, HeapData, QFunction, QInstance, QList, QNumber, QString,
    QValue, Result, ScriptedFunction, Upvalue, ValueKey, attrs,
    builtins::make_builtins,
    error::{arity_error, attribute_error, name_error, type_error},
    heap::{DEFAULT_GC_THRESHOLD, DEFAULT_HEAP_LIMIT, HeapId},
    io::{DefaultStderr, DefaultStdout, QuillFile, QuillWrite},
    operators, runtime_error,
};
use quill_bytecode::{Constant, ConstantIndex, Instruction, InstructionReader, Program};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::{cell::RefCell, rc::Rc};

// Arguments in flight during a call, gathered off the operand stack
type CallArgs = SmallVec<[QValue; 8]>;

/// The configurable settings that should be used by the Quill runtime
pub struct QuillVmSettings {
    /// The runtime's `stdout`
    ///
    /// Default: [`DefaultStdout`]
    pub stdout: Rc<dyn QuillFile>,

    /// The runtime's `stderr`, used for warnings and uncaught error reports
    ///
    /// Default: [`DefaultStderr`]
    pub stderr: Rc<dyn QuillFile>,

    /// The maximum number of values the operand stack may hold
    ///
    /// Exceeding the limit produces a *StackOverflow* error.
    pub stack_limit: usize,

    /// The maximum number of frames the call stack may hold
    ///
    /// Exceeding the limit produces a *StackOverflow* error.
    pub call_depth_limit: usize,

    /// The number of live heap objects that triggers a collection
    pub gc_threshold: usize,

    /// The ceiling on the number of live heap objects
    ///
    /// Exceeding the ceiling produces a fatal *AllocationError*.
    pub heap_limit: usize,
}

impl Default for QuillVmSettings {
    fn default() -> Self {
        Self {
            stdout: Rc::new(DefaultStdout::default()),
            stderr: Rc::new(DefaultStderr::default()),
            stack_limit: 16 * 1024,
            call_depth_limit: 512,
            gc_threshold: DEFAULT_GC_THRESHOLD,
            heap_limit: DEFAULT_HEAP_LIMIT,
        }
    }
}

/// The lifecycle state of a VM
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionState {
    /// No program has been prepared yet
    Uninitialised,
    /// A program has been prepared and the VM is ready to run it
    Ready,
    /// The VM is executing instructions
    Running,
    /// The VM is paused inside a synchronous garbage collection
    Collecting,
    /// The program ran to completion
    Halted,
    /// The program was stopped by an uncaught or fatal error
    Faulted,
}

// The outcome of a single instruction
enum ControlFlow {
    Continue,
    Halt,
}

// An installed exception handler: where to resume, and the operand stack depth to
// restore before resuming
struct CatchPoint {
    ip: usize,
    stack_size: usize,
}

// A per-call execution record
struct Frame {
    // The ip to resume from when the frame is popped
    return_ip: usize,
    // The operand stack depth at frame entry; the stack is truncated back to this on
    // return and unwind
    stack_base: usize,
    // The frame's local variables, as shared cells so that closures can capture them
    // by reference
    locals: FxHashMap<ConstantIndex, Upvalue>,
    // The executing function, None for the main frame
    function: Option<HeapId>,
    // The frame's installed exception handlers
    catch_stack: Vec<CatchPoint>,
    // Set while a constructor runs; pushed as the call's result instead of the
    // constructor's return value
    constructed_instance: Option<QValue>,
}

impl Frame {
    fn new(return_ip: usize, stack_base: usize, function: Option<HeapId>) -> Self {
        Self {
            return_ip,
            stack_base,
            locals: FxHashMap::default(),
            function,
            catch_stack: Vec::new(),
            constructed_instance: None,
        }
    }
}

/// The Quill runtime's virtual machine
///
/// The tables that the original runtime kept as process globals (the builtin table and
/// the collector's registry) are fields here, so multiple VMs can coexist and teardown
/// is deterministic.
pub struct QuillVm {
    // The VM's instruction reader, containing a pointer to the program being executed
    reader: InstructionReader,
    // The operand stack
    stack: Vec<QValue>,
    // The call stack
    call_stack: Vec<Frame>,
    // The module's top-level variable map
    globals: FxHashMap<ConstantIndex, QValue>,
    // The garbage collector's registry; the owner of every heap value
    pub(crate) heap: Heap,
    // The builtin function table, installed by prepare()
    builtins: FxHashMap<&'static str, crate::NativeFunction>,
    settings: QuillVmSettings,
    state: ExecutionState,
}

impl Default for QuillVm {
    fn default() -> Self {
        Self::with_settings(QuillVmSettings::default())
    }
}

impl QuillVm {
    /// Initializes a Quill VM with the provided settings
    pub fn with_settings(settings: QuillVmSettings) -> Self {
        Self {
            reader: InstructionReader::default(),
            stack: Vec::with_capacity(32),
            call_stack: Vec::new(),
            globals: FxHashMap::default(),
            heap: Heap::with_limits(settings.gc_threshold, settings.heap_limit),
            builtins: FxHashMap::default(),
            settings,
            state: ExecutionState::Uninitialised,
        }
    }

    /// The VM's current lifecycle state
    pub fn execution_state(&self) -> &ExecutionState {
        &self.state
    }

    /// The `stdout` wrapper used by the VM
    pub fn stdout(&self) -> &Rc<dyn QuillFile> {
        &self.settings.stdout
    }

    /// The `stderr` wrapper used by the VM
    pub fn stderr(&self) -> &Rc<dyn QuillFile> {
        &self.settings.stderr
    }

    /// The number of values currently registered with the collector
    pub fn live_heap_objects(&self) -> usize {
        self.heap.live_count()
    }

    /// Builds the root scope for the given program and moves the VM to *Ready*
    ///
    /// Installs the builtin table, binds `argv` as a list of strings when the program
    /// refers to that name, and sets up the main frame.
    pub fn prepare(&mut self, program: Rc<Program>, argv: &[String]) -> Result<()> {
        if self.state != ExecutionState::Uninitialised {
            return runtime_error!(ErrorKind::Internal(
                "prepare requires a fresh or torn-down VM".into()
            ));
        }

        self.builtins = make_builtins();
        self.reader = InstructionReader::new(program);

        if let Some(name) = self.reader.program.constants.find_str("argv") {
            let args = argv.iter().map(|arg| QValue::from(arg.as_str())).collect();
            let id = self.heap.allocate(HeapData::List(QList::from_vec(args)))?;
            self.globals.insert(name, QValue::List(id));
        }

        self.call_stack.push(Frame::new(0, 0, None));
        self.state = ExecutionState::Ready;
        Ok(())
    }

    /// Drives the dispatch loop to completion and returns the process exit code
    ///
    /// 0 = normal completion, 1 = uncaught error, 2 = fatal/internal fault. Uncaught
    /// errors are reported on the configured stderr as `ErrorKind: message`.
    pub fn run(&mut self) -> i32 {
        if self.state != ExecutionState::Ready {
            let _ = self
                .settings
                .stderr
                .write_line("InternalError: run requires a prepared program");
            self.state = ExecutionState::Faulted;
            return 2;
        }

        self.state = ExecutionState::Running;
        match self.execute_instructions() {
            Ok(()) => {
                self.state = ExecutionState::Halted;
                0
            }
            Err(error) => {
                let _ = self.settings.stderr.write_line(&error.to_string());
                self.state = ExecutionState::Faulted;
                if error.is_fatal() { 2 } else { 1 }
            }
        }
    }

    /// Releases every runtime resource: the operand stack, frames, globals, and all
    /// registered heap values
    ///
    /// The VM returns to *Uninitialised* and can be prepared again.
    pub fn teardown(&mut self) {
        self.stack.clear();
        self.call_stack.clear();
        self.globals.clear();
        self.builtins = FxHashMap::default();
        self.reader = InstructionReader::default();
        self.heap.clear();
        self.state = ExecutionState::Uninitialised;
    }

    /// Runs a synchronous collection cycle, returning the number of freed values
    ///
    /// Collections normally run between instructions when the registry crosses its
    /// threshold; this entry point exists for embedders and tests.
    pub fn collect_now(&mut self) -> usize {
        let previous = std::mem::replace(&mut self.state, ExecutionState::Collecting);

        let mut roots: Vec<HeapId> = Vec::new();
        for value in &self.stack {
            note_root(value, &mut roots);
        }
        for value in self.globals.values() {
            note_root(value, &mut roots);
        }
        for frame in &self.call_stack {
            if let Some(id) = frame.function {
                roots.push(id);
            }
            if let Some(value) = &frame.constructed_instance {
                note_root(value, &mut roots);
            }
            for cell in frame.locals.values() {
                note_root(&cell.borrow(), &mut roots);
            }
        }

        let freed = self.heap.collect(&roots);
        self.state = previous;
        freed
    }

    /// Converts a value to the string that `print` and `string` produce for it
    pub fn value_to_display_string(&self, value: &QValue) -> String {
        self.heap.value_to_string(value)
    }

    pub(crate) fn warn(&self, message: &str) {
        let _ = self.settings.stderr.write_line(message);
    }

    fn execute_instructions(&mut self) -> Result<()> {
        loop {
            // The safe point between instructions where collections may run
            if self.heap.should_collect() {
                self.collect_now();
            }

            let Some(instruction) = self.reader.next() else {
                // Ran off the end of the bytecode: normal completion of the main frame
                return Ok(());
            };

            match self.execute_instruction(instruction) {
                Ok(ControlFlow::Continue) => {}
                Ok(ControlFlow::Halt) => return Ok(()),
                Err(error) => self.unwind(error)?,
            }
        }
    }

    fn execute_instruction(&mut self, instruction: Instruction) -> Result<ControlFlow> {
        use Instruction::*;

        match instruction {
            Error { message } => return runtime_error!(ErrorKind::Internal(message)),
            LoadConst { constant } => {
                let value = self.constant_value(constant)?;
                self.push(value)?;
            }
            LoadNull => self.push(QValue::Null)?,
            LoadUndef => self.push(QValue::Undefined)?,
            LoadTrue => self.push(QValue::Number(QNumber::I64(1)))?,
            LoadFalse => self.push(QValue::Number(QNumber::I64(0)))?,
            LoadName { name } => self.run_load_name(name)?,
            StoreName { name } => self.run_store_name(name)?,
            LoadUpvalue { index } => {
                let value = self.upvalue(index)?.borrow().clone();
                self.push(value)?;
            }
            StoreUpvalue { index } => {
                let value = self.pop()?;
                *self.upvalue(index)?.borrow_mut() = value;
            }
            Pop => {
                self.pop()?;
            }
            BinaryOp { op } => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                let result = operators::binary_op(&mut self.heap, op, &lhs, &rhs)?;
                self.push(result)?;
            }
            Not => {
                let value = self.pop()?;
                self.push(operators::not(&self.heap, &value))?;
            }
            Negate => {
                let value = self.pop()?;
                let result = operators::negate(&value)?;
                self.push(result)?;
            }
            MakeList { count } => {
                let values = self.pop_many(count as usize)?;
                let id = self
                    .heap
                    .allocate(HeapData::List(QList::from_vec(values.into_vec())))?;
                self.push(QValue::List(id))?;
            }
            MakeMap { count } => {
                let entries = self.pop_many(count as usize * 2)?;
                let mut map = crate::QMap::with_capacity(count as usize);
                for pair in entries.chunks_exact(2) {
                    let key = ValueKey::try_from(pair[0].clone())?;
                    map.insert(key, pair[1].clone());
                }
                let id = self.heap.allocate(HeapData::Map(map))?;
                self.push(QValue::Map(id))?;
            }
            MakeSet { count } => {
                let elements = self.pop_many(count as usize)?;
                let mut set = crate::QSet::with_capacity(count as usize);
                for element in elements {
                    set.insert(ValueKey::try_from(element)?);
                }
                let id = self.heap.allocate(HeapData::Set(set))?;
                self.push(QValue::Set(id))?;
            }
            IndexGet => {
                let index = self.pop()?;
                let target = self.pop()?;
                let result = operators::index_get(&self.heap, &target, &index)?;
                self.push(result)?;
            }
            IndexSet => {
                let value = self.pop()?;
                let index = self.pop()?;
                let target = self.pop()?;
                operators::index_set(&mut self.heap, &target, &index, value)?;
            }
            AttrGet { name } => self.run_attr_get(name)?,
            AttrSet { name } => self.run_attr_set(name)?,
            AttrCall { name, arg_count } => self.run_attr_call(name, arg_count)?,
            Jump { offset } => self.reader.ip += offset as usize,
            JumpBack { offset } => self.reader.ip -= offset as usize,
            JumpIfFalse { offset } => {
                let value = self.pop()?;
                if !self.heap.is_truthy(&value) {
                    self.reader.ip += offset as usize;
                }
            }
            JumpIfTrue { offset } => {
                let value = self.pop()?;
                if self.heap.is_truthy(&value) {
                    self.reader.ip += offset as usize;
                }
            }
            Call { arg_count } => {
                let args = self.pop_many(arg_count as usize)?;
                let callable = self.pop()?;
                self.call_value(callable, args, None)?;
            }
            Return => {
                let result = self.pop()?;
                return self.pop_frame(result);
            }
            ReturnNone => return self.pop_frame(QValue::Undefined),
            MakeFunction { function } => {
                let value = self.make_function_value(function)?;
                self.push(value)?;
            }
            MakeClass { class } => self.run_make_class(class)?,
            TryStart { catch_offset } => {
                let catch_point = CatchPoint {
                    ip: self.reader.ip + catch_offset as usize,
                    stack_size: self.stack.len(),
                };
                self.frame_mut().catch_stack.push(catch_point);
            }
            TryEnd => {
                self.frame_mut().catch_stack.pop();
            }
            Raise => {
                let value = self.pop()?;
                let message = self.heap.value_to_string(&value);
                return runtime_error!(ErrorKind::Raised(message));
            }
            Deconstruct => self.run_deconstruct()?,
        }

        Ok(ControlFlow::Continue)
    }

    // Unwinds after a catchable error: pops handlers and frames until a handler is
    // found, or surfaces the error out of the dispatch loop. Popped frames release
    // their stack slice immediately, so the collector's root set shrinks as the
    // unwind progresses.
    fn unwind(&mut self, error: Error) -> Result<()> {
        if error.is_fatal() {
            return Err(error);
        }

        loop {
            let Some(frame) = self.call_stack.last_mut() else {
                return Err(error);
            };

            if let Some(catch_point) = frame.catch_stack.pop() {
                self.stack.truncate(catch_point.stack_size);
                self.reader.ip = catch_point.ip;
                return Ok(());
            }

            if self.call_stack.len() == 1 {
                // The main frame has no handler; the error is uncaught
                return Err(error);
            }

            let frame = self.call_stack.pop().expect("Empty call stack");
            self.stack.truncate(frame.stack_base);
            self.reader.ip = frame.return_ip;
        }
    }

    fn call_value(
        &mut self,
        callable: QValue,
        args: CallArgs,
        constructed_instance: Option<QValue>,
    ) -> Result<()> {
        match callable {
            QValue::Function(id) => {
                let function = self.heap.function(id).clone();
                match function {
                    QFunction::Scripted(scripted) => {
                        self.call_scripted(id, &scripted, args, constructed_instance)
                    }
                    QFunction::Native(native) => {
                        if let Some(arity) = native.arity {
                            if args.len() != arity as usize {
                                return arity_error(format!(
                                    "{} expects {arity} argument(s), found {}",
                                    native.name,
                                    args.len()
                                ));
                            }
                        }
                        let result = {
                            let mut ctx = CallContext::new(self, &args);
                            (native.function)(&mut ctx)?
                        };
                        self.push(result)
                    }
                }
            }
            QValue::Class(id) => {
                let class = self.heap.class(id);
                let constructor = class.constructor.clone();
                let class_name = class.name.clone();
                let instance_id = self.heap.allocate(HeapData::Instance(QInstance::new(id)))?;
                let instance = QValue::Instance(instance_id);

                match constructor {
                    Some(constructor) => {
                        let mut constructor_args = CallArgs::with_capacity(args.len() + 1);
                        constructor_args.push(instance.clone());
                        constructor_args.extend(args);
                        self.call_value(constructor, constructor_args, Some(instance))
                    }
                    None => {
                        if !args.is_empty() {
                            return arity_error(format!(
                                "class '{class_name}' has no constructor and takes no arguments, found {}",
                                args.len()
                            ));
                        }
                        self.push(instance)
                    }
                }
            }
            unexpected => type_error(format!(
                "a value of type '{}' isn't callable",
                unexpected.type_as_string()
            )),
        }
    }

    // The scripted call protocol: check arity, bind parameters into a fresh frame's
    // locals, record the return offset, and jump to the function's code
    fn call_scripted(
        &mut self,
        id: HeapId,
        function: &ScriptedFunction,
        args: CallArgs,
        constructed_instance: Option<QValue>,
    ) -> Result<()> {
        if self.call_stack.len() >= self.settings.call_depth_limit {
            return runtime_error!(ErrorKind::StackOverflow(format!(
                "the maximum call depth of {} frames has been reached",
                self.settings.call_depth_limit
            )));
        }

        let program = self.reader.program.clone();
        let Some(info) = program.functions.get(function.function as usize) else {
            return runtime_error!(ErrorKind::Internal(format!(
                "unknown function descriptor {}",
                function.function
            )));
        };

        if args.len() != info.arity as usize {
            return arity_error(format!(
                "function expects {} argument(s), found {}",
                info.arity,
                args.len()
            ));
        }

        let mut frame = Frame::new(self.reader.ip, self.stack.len(), Some(id));
        frame.constructed_instance = constructed_instance;
        for (param, arg) in info.params.iter().zip(args) {
            frame.locals.insert(*param, Rc::new(RefCell::new(arg)));
        }

        self.call_stack.push(frame);
        self.reader.ip = info.ip;
        Ok(())
    }

    // Pops the current frame: truncates the operand stack to the frame's base,
    // restores the saved ip, and pushes the call's result in the caller's frame
    fn pop_frame(&mut self, result: QValue) -> Result<ControlFlow> {
        let Some(frame) = self.call_stack.pop() else {
            return runtime_error!(ErrorKind::Internal("empty call stack".into()));
        };

        self.stack.truncate(frame.stack_base);

        if self.call_stack.is_empty() {
            // The main frame returned; the program is done
            return Ok(ControlFlow::Halt);
        }

        self.reader.ip = frame.return_ip;
        let result = frame.constructed_instance.unwrap_or(result);
        self.push(result)?;
        Ok(ControlFlow::Continue)
    }

    fn run_load_name(&mut self, name: ConstantIndex) -> Result<()> {
        if let Some(cell) = self.frame().locals.get(&name) {
            let value = cell.borrow().clone();
            return self.push(value);
        }

        if let Some(cell) = self.capture_cell_by_name(name) {
            let value = cell.borrow().clone();
            return self.push(value);
        }

        if let Some(value) = self.globals.get(&name) {
            let value = value.clone();
            return self.push(value);
        }

        let program = self.reader.program.clone();
        let name_str = program.constants.get_str(name);
        if let Some(builtin) = self.builtins.get(name_str) {
            let builtin = builtin.clone();
            let id = self
                .heap
                .allocate(HeapData::Function(QFunction::Native(builtin)))?;
            return self.push(QValue::Function(id));
        }

        name_error(format!("undefined identifier '{name_str}'"))
    }

    // The innermost existing binding is written; unbound names become a local in the
    // current frame, or a global at the top level
    fn run_store_name(&mut self, name: ConstantIndex) -> Result<()> {
        let value = self.pop()?;

        if let Some(cell) = self.frame().locals.get(&name) {
            *cell.borrow_mut() = value;
            return Ok(());
        }

        if let Some(cell) = self.capture_cell_by_name(name) {
            *cell.borrow_mut() = value;
            return Ok(());
        }

        if self.call_stack.len() == 1 || self.globals.contains_key(&name) {
            self.globals.insert(name, value);
            return Ok(());
        }

        self.frame_mut()
            .locals
            .insert(name, Rc::new(RefCell::new(value)));
        Ok(())
    }

    fn run_attr_get(&mut self, name: ConstantIndex) -> Result<()> {
        let target = self.pop()?;
        let program = self.reader.program.clone();
        let name_str = program.constants.get_str(name);

        match &target {
            QValue::Instance(id) => {
                let key = ValueKey::from(name_str);
                let field = self.heap.instance(*id).fields.get(&key).cloned();
                if let Some(field) = field {
                    return self.push(field);
                }
                let method = {
                    let instance = self.heap.instance(*id);
                    self.heap.class(instance.class).methods.get(&key).cloned()
                };
                if let Some(method) = method {
                    return self.push(method);
                }
                let class_name = self.instance_class_name(*id);
                attribute_error(format!(
                    "'{class_name}' instance has no attribute '{name_str}'"
                ))
            }
            QValue::Map(id) => {
                let key = ValueKey::from(name_str);
                match self.heap.map(*id).get(&key) {
                    Some(value) => self.push(value),
                    None => crate::error::key_error(format!("key '{name_str}' not found in map")),
                }
            }
            unexpected => attribute_error(format!(
                "a value of type '{}' has no attribute '{name_str}'",
                unexpected.type_as_string()
            )),
        }
    }

    fn run_attr_set(&mut self, name: ConstantIndex) -> Result<()> {
        let value = self.pop()?;
        let target = self.pop()?;
        let program = self.reader.program.clone();
        let name_str = program.constants.get_str(name);

        match &target {
            QValue::Instance(id) => {
                self.heap
                    .instance_mut(*id)
                    .fields
                    .insert(ValueKey::from(name_str), value);
                Ok(())
            }
            QValue::Map(id) => {
                self.heap
                    .map_mut(*id)
                    .insert(ValueKey::from(name_str), value);
                Ok(())
            }
            unexpected => type_error(format!(
                "unable to assign attribute '{name_str}' on a value of type '{}'",
                unexpected.type_as_string()
            )),
        }
    }

    fn run_attr_call(&mut self, name: ConstantIndex, arg_count: u8) -> Result<()> {
        let args = self.pop_many(arg_count as usize)?;
        let target = self.pop()?;
        let program = self.reader.program.clone();
        let name_str = program.constants.get_str(name);

        if let QValue::Instance(id) = &target {
            let key = ValueKey::from(name_str);

            // Class methods take precedence, and bind the instance as the implicit
            // first argument
            let method = {
                let instance = self.heap.instance(*id);
                self.heap.class(instance.class).methods.get(&key).cloned()
            };
            if let Some(method) = method {
                let mut method_args = CallArgs::with_capacity(args.len() + 1);
                method_args.push(target.clone());
                method_args.extend(args);
                return self.call_value(method, method_args, None);
            }

            // Fall through to a callable value stored in the instance's fields
            let field = self.heap.instance(*id).fields.get(&key).cloned();
            if let Some(field) = field {
                return self.call_value(field, args, None);
            }

            let class_name = self.instance_class_name(*id);
            return attribute_error(format!(
                "'{class_name}' instance has no method '{name_str}'"
            ));
        }

        let result = attrs::call_builtin_attr(self, &target, name_str, &args)?;
        self.push(result)
    }

    fn make_function_value(&mut self, function: u32) -> Result<QValue> {
        let program = self.reader.program.clone();
        let Some(info) = program.functions.get(function as usize) else {
            return runtime_error!(ErrorKind::Internal(format!(
                "unknown function descriptor {function}"
            )));
        };

        // Snapshot the free variables by reference, so that mutation inside the
        // closure is visible to the enclosing scope
        let mut upvalues = Vec::with_capacity(info.captures.len());
        for capture in &info.captures {
            let cell = self
                .frame()
                .locals
                .get(capture)
                .cloned()
                .or_else(|| self.capture_cell_by_name(*capture));
            match cell {
                Some(cell) => upvalues.push(cell),
                None => {
                    let name_str = program.constants.get_str(*capture);
                    return name_error(format!(
                        "undefined identifier '{name_str}' captured by function"
                    ));
                }
            }
        }

        let id = self
            .heap
            .allocate(HeapData::Function(QFunction::Scripted(ScriptedFunction {
                function,
                upvalues,
            })))?;
        Ok(QValue::Function(id))
    }

    fn run_make_class(&mut self, class: u32) -> Result<()> {
        let program = self.reader.program.clone();
        let Some(info) = program.classes.get(class as usize) else {
            return runtime_error!(ErrorKind::Internal(format!(
                "unknown class descriptor {class}"
            )));
        };

        let mut methods = crate::ValueMap::default();
        for (method_name, function) in &info.methods {
            let method = self.make_function_value(*function)?;
            let name_str = program.constants.get_str(*method_name);
            methods.insert(ValueKey::from(name_str), method);
        }

        let constructor = match info.constructor {
            Some(function) => Some(self.make_function_value(function)?),
            None => None,
        };

        let name = QString::from(program.constants.get_str(info.name));
        let id = self.heap.allocate(HeapData::Class(crate::QClass {
            name,
            methods,
            constructor,
        }))?;
        self.push(QValue::Class(id))
    }

    fn run_deconstruct(&mut self) -> Result<()> {
        let message = match self.stack.last() {
            Some(value) => format!(
                "deconstruct: {} ({}) | stack: {}, frames: {}, heap: {}",
                self.heap.value_to_string(value),
                value.type_as_string(),
                self.stack.len(),
                self.call_stack.len(),
                self.heap.live_count()
            ),
            None => format!(
                "deconstruct: empty stack | frames: {}, heap: {}",
                self.call_stack.len(),
                self.heap.live_count()
            ),
        };
        self.settings.stderr.write_line(&message)
    }

    fn constant_value(&self, constant: ConstantIndex) -> Result<QValue> {
        match self.reader.program.constants.get(usize::from(constant)) {
            Some(Constant::F64(n)) => Ok(QValue::Number(QNumber::F64(n))),
            Some(Constant::I64(n)) => Ok(QValue::Number(QNumber::I64(n))),
            Some(Constant::Str(s)) => Ok(QValue::Str(s.into())),
            None => runtime_error!(ErrorKind::Internal(format!(
                "invalid constant index {constant}"
            ))),
        }
    }

    fn capture_cell_by_name(&self, name: ConstantIndex) -> Option<Upvalue> {
        let frame = self.frame();
        let id = frame.function?;
        let QFunction::Scripted(function) = self.heap.function(id) else {
            return None;
        };
        let info = self.reader.program.functions.get(function.function as usize)?;
        let position = info.captures.iter().position(|capture| *capture == name)?;
        function.upvalues.get(position).cloned()
    }

    fn upvalue(&self, index: u8) -> Result<Upvalue> {
        let cell = self.frame().function.and_then(|id| {
            match self.heap.function(id) {
                QFunction::Scripted(function) => function.upvalues.get(index as usize).cloned(),
                QFunction::Native(_) => None,
            }
        });

        match cell {
            Some(cell) => Ok(cell),
            None => runtime_error!(ErrorKind::Internal(format!("invalid upvalue index {index}"))),
        }
    }

    fn instance_class_name(&self, id: HeapId) -> QString {
        let instance = self.heap.instance(id);
        self.heap.class(instance.class).name.clone()
    }

    fn frame(&self) -> &Frame {
        self.call_stack.last().expect("Empty call stack")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.call_stack.last_mut().expect("Empty call stack")
    }

    fn push(&mut self, value: QValue) -> Result<()> {
        if self.stack.len() >= self.settings.stack_limit {
            return runtime_error!(ErrorKind::StackOverflow(format!(
                "the operand stack limit of {} values has been reached",
                self.settings.stack_limit
            )));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<QValue> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => runtime_error!(ErrorKind::Internal("operand stack underflow".into())),
        }
    }

    fn pop_many(&mut self, count: usize) -> Result<CallArgs> {
        if self.stack.len() < count {
            return runtime_error!(ErrorKind::Internal("operand stack underflow".into()));
        }
        let split_at = self.stack.len() - count;
        Ok(SmallVec::from_vec(self.stack.split_off(split_at)))
    }
}

fn note_root(value: &QValue, roots: &mut Vec<HeapId>) {
    if let Some(id) = value.heap_id() {
        roots.push(id);
    }
}
