//! Fixed-arity tuples of same-shaped containers, e.g. the fields of a
//! multi-field system. Operations recurse one level into the components.

use crate::core::policy::Composite;
use crate::core::traits::Container;
use crate::reduction::Superaccumulator;

impl<V: Container, const N: usize> Container for [V; N] {
    type Scalar = V::Scalar;
    type Classifier = Composite<V::Classifier>;

    fn size(&self) -> usize {
        self.iter().map(Container::size).sum()
    }

    fn kernel1<F>(y: &mut Self, f: &F)
    where
        F: Fn(&mut V::Scalar) + Sync + Send,
    {
        for yi in y.iter_mut() {
            V::kernel1(yi, f);
        }
    }

    fn kernel2<F>(x: &Self, y: &mut Self, f: &F)
    where
        F: Fn(V::Scalar, &mut V::Scalar) + Sync + Send,
    {
        for (yi, xi) in y.iter_mut().zip(x) {
            V::kernel2(xi, yi, f);
        }
    }

    fn kernel3<F>(x1: &Self, x2: &Self, y: &mut Self, f: &F)
    where
        F: Fn(V::Scalar, V::Scalar, &mut V::Scalar) + Sync + Send,
    {
        for ((yi, a), b) in y.iter_mut().zip(x1).zip(x2) {
            V::kernel3(a, b, yi, f);
        }
    }

    fn kernel4<F>(x1: &Self, x2: &Self, x3: &Self, y: &mut Self, f: &F)
    where
        F: Fn(V::Scalar, V::Scalar, V::Scalar, &mut V::Scalar) + Sync + Send,
    {
        for (((yi, a), b), c) in y.iter_mut().zip(x1).zip(x2).zip(x3) {
            V::kernel4(a, b, c, yi, f);
        }
    }

    /// Component accumulators are merged exactly before the single rounding.
    fn accumulate(x: &Self, w: Option<&Self>, y: &Self) -> Superaccumulator {
        (0..N).fold(Superaccumulator::new(), |acc, i| {
            acc.merge(V::accumulate(&x[i], w.map(|w| &w[i]), &y[i]))
        })
    }

    fn assert_compatible(&self, other: &Self) {
        for (a, b) in self.iter().zip(other) {
            a.assert_compatible(b);
        }
    }
}
