use anyhow::anyhow;

/// Whether an in-memory driven port should behave as if its backing store is reachable.
/// Fakes call [Connectivity::blow_up_if_disconnected] first thing so tests can exercise
/// the error path of a service.
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    /// Return an error if connectivity is in a "disconnected" state
    pub fn blow_up_if_disconnected(&self) -> Result<(), anyhow::Error> {
        match self {
            Self::Connected => Ok(()),
            Self::Disconnected => Err(anyhow!("could not connect to service!")),
        }
    }
}

/// Records the arguments of every call to a mocked function and hands back a canned return
/// value. Async trait methods don't play well with the usual mocking crates, so mock services
/// hold one of these per method behind a [std::sync::Mutex].
///
/// * `Args` is whatever should be captured per call (use a tuple for several arguments)
/// * `Ret` is the mocked function's return type
///
/// ```ignore
/// impl TaskPort for Mutex<MockTaskService> {
///     async fn task_by_id(&self, owner: i32, task_id: i32, /* ... */) -> Result<Task, TaskError> {
///         let mut locked_self = self.lock().unwrap();
///         locked_self.task_by_id_result.save_arguments((owner, task_id));
///         locked_self.task_by_id_result.return_value_result()
///     }
/// }
/// ```
pub struct FakeImplementation<Args, Ret> {
    saved_arguments: Vec<Args>,
    return_value: Option<Ret>,
}

impl<Args, Ret> FakeImplementation<Args, Ret> {
    pub fn new() -> FakeImplementation<Args, Ret> {
        FakeImplementation {
            saved_arguments: Vec::new(),
            return_value: None,
        }
    }

    /// Saves arguments from a single invocation
    pub fn save_arguments(&mut self, arguments: Args) {
        self.saved_arguments.push(arguments)
    }

    /// Arguments passed on every call so far, oldest first
    pub fn calls(&self) -> &[Args] {
        self.saved_arguments.as_slice()
    }
}

impl<Args, Success, Fail> FakeImplementation<Args, Result<Success, Fail>>
where
    Success: Clone,
    Fail: Clone,
{
    /// Set the result returned on every invocation
    pub fn set_returned_result(&mut self, return_value: Result<Success, Fail>) {
        self.return_value = Some(return_value);
    }

    /// Retrieve a copy of the configured result
    pub fn return_value_result(&self) -> Result<Success, Fail> {
        match self.return_value {
            Some(Ok(ref ok_result)) => Ok(ok_result.clone()),
            Some(Err(ref err)) => Err(err.clone()),
            None => panic!("Tried to return from a function where the return value wasn't set!"),
        }
    }
}

impl<Args, Success> FakeImplementation<Args, anyhow::Result<Success>>
where
    Success: Clone,
{
    /// Variant of [FakeImplementation::set_returned_result] for [anyhow::Result], since
    /// [anyhow::Error] can't be cloned. Errors are stored as their rendered message.
    pub fn set_returned_anyhow(&mut self, return_value: anyhow::Result<Success>) {
        match return_value {
            Ok(ok_result) => self.return_value = Some(Ok(ok_result)),
            Err(err) => self.return_value = Some(Err(anyhow!(format!("{}", err)))),
        }
    }

    pub fn return_value_anyhow(&self) -> anyhow::Result<Success> {
        match self.return_value {
            None => panic!("Tried to return from a function where the value wasn't set!"),
            Some(Ok(ref ok_result)) => Ok(ok_result.clone()),
            Some(Err(ref err)) => Err(anyhow!(format!("{}", err))),
        }
    }
}
