use crate::error::QuantizeError;

/// Row-granular progress reporting and cancellation.
///
/// `set_total` is called once before any pass starts. `advance` is called
/// once per processed row in every full-image pass; returning `false`
/// aborts the conversion with [`QuantizeError::Cancelled`].
pub trait Progress {
    fn set_total(&mut self, _steps: u64, _label: &str) {}

    fn advance(&mut self) -> bool;
}

/// Progress sink that never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unstoppable;

impl Progress for Unstoppable {
    fn advance(&mut self) -> bool {
        true
    }
}

/// Adapts a closure into a [`Progress`] implementation.
///
/// ```
/// use rgb2map::progress::{Progress, ProgressFn};
///
/// let mut rows = 0;
/// let mut p = ProgressFn(|| {
///     rows += 1;
///     rows < 10
/// });
/// assert!(p.advance());
/// ```
pub struct ProgressFn<F>(pub F);

impl<F> Progress for ProgressFn<F>
where
    F: FnMut() -> bool,
{
    fn advance(&mut self) -> bool {
        (self.0)()
    }
}

/// Advance by one row, mapping a refusal to `Cancelled`.
#[inline]
pub(crate) fn row_done(progress: &mut dyn Progress) -> Result<(), QuantizeError> {
    if progress.advance() {
        Ok(())
    } else {
        Err(QuantizeError::Cancelled)
    }
}
