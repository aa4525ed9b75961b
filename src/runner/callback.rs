//! Callback protocol for submitted work

use super::WorkError;

/// Receives the lifecycle of one submission
///
/// `before_start` runs on the submitting thread before the work is handed to
/// an execution context. Afterwards exactly one of `on_success` or
/// `on_failure` runs on the main context. Both consume the callback, so a
/// second terminal call cannot be expressed.
pub trait TaskCallback<R, E>: Sized {
    fn before_start(&mut self) {}

    fn on_success(self, value: R);

    fn on_failure(self, error: WorkError<E>);
}

fn no_op() {}

/// [`TaskCallback`] built from closures, see [`callbacks`]
pub struct Callbacks<S, F, B = fn()> {
    before: B,
    on_success: S,
    on_failure: F,
}

/// Build a callback from a success closure and a failure closure
///
/// ```
/// use offload::{callbacks, WorkError};
///
/// let cb = callbacks(
///     |value: u32| println!("got {value}"),
///     |error: WorkError<String>| eprintln!("failed: {error}"),
/// )
/// .before_start(|| println!("starting"));
/// # let _ = cb;
/// ```
pub fn callbacks<R, E, S, F>(on_success: S, on_failure: F) -> Callbacks<S, F>
where
    S: FnOnce(R),
    F: FnOnce(WorkError<E>),
{
    Callbacks {
        before: no_op as fn(),
        on_success,
        on_failure,
    }
}

impl<S, F, B> Callbacks<S, F, B> {
    /// Replace the before-start hook
    pub fn before_start<B2>(self, before: B2) -> Callbacks<S, F, B2>
    where
        B2: FnMut(),
    {
        Callbacks {
            before,
            on_success: self.on_success,
            on_failure: self.on_failure,
        }
    }
}

impl<R, E, S, F, B> TaskCallback<R, E> for Callbacks<S, F, B>
where
    S: FnOnce(R),
    F: FnOnce(WorkError<E>),
    B: FnMut(),
{
    fn before_start(&mut self) {
        (self.before)();
    }

    fn on_success(self, value: R) {
        (self.on_success)(value);
    }

    fn on_failure(self, error: WorkError<E>) {
        (self.on_failure)(error);
    }
}
