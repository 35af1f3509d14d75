//! Ordered, one-at-a-time async mapping
//!
//! The detail fetch for subtasks goes through here so the tracker sees one
//! request at a time and results come back in input order.

use std::future::Future;

/// Map `values` through an async transform, strictly one call at a time
///
/// Each call starts only after the previous one resolved, so the output
/// order is the input order. The transform receives the value and its
/// index. The first error is returned as-is; later inputs are never
/// transformed and no partial output is kept.
///
/// # Errors
/// Returns the first error produced by `f`.
pub async fn sequence_async<I, A, B, E, F, Fut>(values: I, mut f: F) -> Result<Vec<B>, E>
where
    I: IntoIterator<Item = A>,
    F: FnMut(A, usize) -> Fut,
    Fut: Future<Output = Result<B, E>>,
{
    let values = values.into_iter();
    let mut outputs = Vec::with_capacity(values.size_hint().0);

    for (index, value) in values.enumerate() {
        outputs.push(f(value, index).await?);
    }

    Ok(outputs)
}
