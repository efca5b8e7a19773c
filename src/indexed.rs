//! Position metadata for pipeline items.
//!
//! Stage outputs arrive in completion order, so a consumer that cares
//! about provenance tags each input with its position up front and
//! carries the tag through every stage. [`indexed`] wraps an input
//! iterator to do the tagging; [`indexed_fn`] lifts a plain
//! `(index, step, value)` function into a stage transform that re-tags
//! its output and advances the step count.

/// A value tagged with its source position and the number of stages it
/// has passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indexed<T> {
    pub index: usize,
    pub step: usize,
    pub value: T,
}

/// Wrap an iterator so each item carries its position, with `step` 0.
pub fn indexed<I: Iterator>(inner: I) -> IndexedIter<I> {
    IndexedIter {
        inner,
        next_index: 0,
    }
}

/// Iterator adapter produced by [`indexed`].
pub struct IndexedIter<I> {
    inner: I,
    next_index: usize,
}

impl<I: Iterator> Iterator for IndexedIter<I> {
    type Item = Indexed<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.inner.next()?;
        let index = self.next_index;
        self.next_index += 1;
        Some(Indexed {
            index,
            step: 0,
            value,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Lift `f(index, step, value)` into a transform over [`Indexed`] values.
///
/// The output keeps the input's index and carries `step + 1`, so after k
/// chained stages every item reports `step == k`.
pub fn indexed_fn<F, In, Out>(f: F) -> impl Fn(Indexed<In>) -> Indexed<Out>
where
    F: Fn(usize, usize, In) -> Out,
{
    move |item: Indexed<In>| {
        let Indexed { index, step, value } = item;
        Indexed {
            index,
            step: step + 1,
            value: f(index, step, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_items_in_order() {
        let tagged: Vec<_> = indexed(10..13).collect();
        assert_eq!(
            tagged,
            vec![
                Indexed { index: 0, step: 0, value: 10 },
                Indexed { index: 1, step: 0, value: 11 },
                Indexed { index: 2, step: 0, value: 12 },
            ]
        );
    }

    #[test]
    fn lifted_function_advances_the_step() {
        let double = indexed_fn(|_index, _step, value: i32| value * 2);
        let out = double(Indexed {
            index: 3,
            step: 0,
            value: 21,
        });
        assert_eq!(out, Indexed { index: 3, step: 1, value: 42 });
    }

    #[test]
    fn lifted_function_sees_the_incoming_tags() {
        let check = indexed_fn(|index, step, value: usize| {
            assert_eq!(index, value);
            assert_eq!(step, 0);
            value
        });
        for item in indexed(0..4) {
            check(item);
        }
    }
}
