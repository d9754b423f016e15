//! Lazy cross-product streams for enumerating candidate version tuples.
//!
//! `cross_combine` pairs every value one stream produces with every value
//! the other produces, regardless of arrival order: two append-only buffers
//! hold the values seen so far from each side, and a new arrival is paired
//! with everything buffered on the opposite side. A single mutex serializes
//! buffer access; it is never held while a pair is handed to the consumer.

use std::sync::{Arc, Mutex};

use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt};

use carton_util::errors::CartonResult;

/// Buffered values from each side, plus the failure latch.
struct CrossState<A, B> {
    left: Vec<A>,
    right: Vec<B>,
    failed: bool,
}

enum Arrival<A, B> {
    Left(CartonResult<A>),
    Right(CartonResult<B>),
}

/// All pairs `(a, b)` where `a` came from `left` and `b` from `right`.
///
/// Pairs are emitted incrementally as either side produces values, each
/// pair exactly once. The stream completes once both inputs complete and
/// every cross pair is out; the first error from either side is forwarded
/// once and ends all further pairing.
pub fn cross_combine<'a, A, B>(
    left: BoxStream<'a, CartonResult<A>>,
    right: BoxStream<'a, CartonResult<B>>,
) -> BoxStream<'a, CartonResult<(A, B)>>
where
    A: Clone + Send + 'a,
    B: Clone + Send + 'a,
{
    let state = Arc::new(Mutex::new(CrossState::<A, B> {
        left: Vec::new(),
        right: Vec::new(),
        failed: false,
    }));

    stream::select(left.map(Arrival::Left), right.map(Arrival::Right))
        .map(move |arrival| {
            // Pairs are collected under the lock but emitted after it drops.
            let out: Vec<CartonResult<(A, B)>> = {
                let mut state = state.lock().expect("cross-combine buffer lock poisoned");
                if state.failed {
                    Vec::new()
                } else {
                    match arrival {
                        Arrival::Left(Ok(a)) => {
                            let pairs = state
                                .right
                                .iter()
                                .map(|b| Ok((a.clone(), b.clone())))
                                .collect();
                            state.left.push(a);
                            pairs
                        }
                        Arrival::Right(Ok(b)) => {
                            let pairs = state
                                .left
                                .iter()
                                .map(|a| Ok((a.clone(), b.clone())))
                                .collect();
                            state.right.push(b);
                            pairs
                        }
                        Arrival::Left(Err(error)) | Arrival::Right(Err(error)) => {
                            state.failed = true;
                            vec![Err(error)]
                        }
                    }
                }
            };
            stream::iter(out)
        })
        .flatten()
        .boxed()
}

/// The n-ary cross product: every tuple choosing one value per input
/// stream, with tuple positions matching input order.
///
/// Built by folding [`cross_combine`] over the inputs, starting from a
/// single empty tuple; with no inputs the result is exactly that empty
/// tuple, then completion.
pub fn permutations<'a, T>(
    inputs: Vec<BoxStream<'a, CartonResult<T>>>,
) -> BoxStream<'a, CartonResult<Vec<T>>>
where
    T: Clone + Send + 'a,
{
    let mut tuples: BoxStream<'a, CartonResult<Vec<T>>> =
        stream::once(future::ready(Ok(Vec::new()))).boxed();
    for input in inputs {
        tuples = cross_combine(tuples, input)
            .map(|pair| {
                pair.map(|(mut tuple, value)| {
                    tuple.push(value);
                    tuple
                })
            })
            .boxed();
    }
    tuples
}
