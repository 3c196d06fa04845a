#![forbid(unsafe_code)]

//! Per-axis data transforms (log scales and friends).
//!
//! A [`TransformFunc`] maps data coordinates along one axis before the model
//! matrix applies. [`AxisTransforms`] bundles one per axis and is what a
//! [`Transformation`](crate::Transformation) node carries.

use std::fmt;
use std::rc::Rc;

use glam::{DVec3, Vec3};

type ScalarFn = Rc<dyn Fn(f64) -> f64>;

/// A user-supplied axis transform.
#[derive(Clone)]
pub struct CustomTransform {
    name: Rc<str>,
    forward: ScalarFn,
    inverse: Option<ScalarFn>,
}

impl CustomTransform {
    pub fn new(name: &str, forward: impl Fn(f64) -> f64 + 'static) -> Self {
        Self {
            name: Rc::from(name),
            forward: Rc::new(forward),
            inverse: None,
        }
    }

    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Fn(f64) -> f64 + 'static) -> Self {
        self.inverse = Some(Rc::new(inverse));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for CustomTransform {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.forward, &other.forward)
    }
}

impl fmt::Debug for CustomTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTransform")
            .field("name", &self.name)
            .field("invertible", &self.inverse.is_some())
            .finish()
    }
}

/// Transform of a single axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TransformFunc {
    #[default]
    Identity,
    /// Natural logarithm.
    Log,
    Log10,
    Log2,
    /// Symmetric log: linear inside `[-threshold, threshold]`, log10 outside.
    Symlog10 { threshold: f64 },
    /// `sign(x) * log10(|x| + 1)`, defined everywhere.
    Pseudolog10,
    Custom(CustomTransform),
}

impl TransformFunc {
    /// Symmetric log with a linear region of width `threshold` around zero.
    #[must_use]
    pub fn symlog10(threshold: f64) -> Self {
        Self::Symlog10 {
            threshold: threshold.abs(),
        }
    }

    #[must_use]
    pub fn custom(name: &str, forward: impl Fn(f64) -> f64 + 'static) -> Self {
        Self::Custom(CustomTransform::new(name, forward))
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Identity => "identity",
            Self::Log => "log",
            Self::Log10 => "log10",
            Self::Log2 => "log2",
            Self::Symlog10 { .. } => "symlog10",
            Self::Pseudolog10 => "pseudolog10",
            Self::Custom(custom) => custom.name(),
        }
    }

    /// Whether `x` lies in the domain of the forward transform.
    #[must_use]
    pub fn in_domain(&self, x: f64) -> bool {
        match self {
            Self::Log | Self::Log10 | Self::Log2 => x > 0.0,
            _ => !x.is_nan(),
        }
    }

    /// Apply the forward transform.
    ///
    /// Values outside the domain produce `NaN`, like the underlying float
    /// functions.
    #[must_use]
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Self::Identity => x,
            Self::Log => x.ln(),
            Self::Log10 => x.log10(),
            Self::Log2 => x.log2(),
            Self::Symlog10 { threshold } => symlog10(x, *threshold),
            Self::Pseudolog10 => x.signum() * (x.abs() + 1.0).log10(),
            Self::Custom(custom) => (custom.forward)(x),
        }
    }

    /// Apply the inverse transform.
    ///
    /// Returns `None` for custom transforms registered without an inverse.
    #[must_use]
    pub fn inverse(&self, y: f64) -> Option<f64> {
        let x = match self {
            Self::Identity => y,
            Self::Log => y.exp(),
            Self::Log10 => 10f64.powf(y),
            Self::Log2 => y.exp2(),
            Self::Symlog10 { threshold } => inverse_symlog10(y, *threshold),
            Self::Pseudolog10 => y.signum() * (10f64.powf(y.abs()) - 1.0),
            Self::Custom(custom) => return custom.inverse.as_ref().map(|inv| inv(y)),
        };
        Some(x)
    }
}

fn symlog10(x: f64, threshold: f64) -> f64 {
    if threshold == 0.0 {
        return x.signum() * x.abs().log10();
    }
    let magnitude = x.abs();
    if magnitude <= threshold {
        x / threshold
    } else {
        x.signum() * (1.0 + (magnitude / threshold).log10())
    }
}

fn inverse_symlog10(y: f64, threshold: f64) -> f64 {
    if threshold == 0.0 {
        return y.signum() * 10f64.powf(y.abs());
    }
    let magnitude = y.abs();
    if magnitude <= 1.0 {
        y * threshold
    } else {
        y.signum() * threshold * 10f64.powf(magnitude - 1.0)
    }
}

/// One [`TransformFunc`] per axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisTransforms {
    pub x: TransformFunc,
    pub y: TransformFunc,
    pub z: TransformFunc,
}

impl AxisTransforms {
    #[must_use]
    pub fn new(x: TransformFunc, y: TransformFunc, z: TransformFunc) -> Self {
        Self { x, y, z }
    }

    /// Transform `x` and `y`, leave `z` untouched. The usual 2D setup.
    #[must_use]
    pub fn xy(x: TransformFunc, y: TransformFunc) -> Self {
        Self {
            x,
            y,
            z: TransformFunc::Identity,
        }
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.x.is_identity() && self.y.is_identity() && self.z.is_identity()
    }

    /// Apply the per-axis transforms to a point.
    #[must_use]
    pub fn apply(&self, point: Vec3) -> Vec3 {
        if self.is_identity() {
            return point;
        }
        let p = point.as_dvec3();
        DVec3::new(self.x.apply(p.x), self.y.apply(p.y), self.z.apply(p.z)).as_vec3()
    }

    /// Invert [`apply`](Self::apply). `None` if any axis is not invertible.
    #[must_use]
    pub fn inverse(&self, point: Vec3) -> Option<Vec3> {
        let p = point.as_dvec3();
        Some(
            DVec3::new(
                self.x.inverse(p.x)?,
                self.y.inverse(p.y)?,
                self.z.inverse(p.z)?,
            )
            .as_vec3(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * (1.0 + a.abs().max(b.abs()))
    }

    #[test]
    fn builtins_invert() {
        let funcs = [
            TransformFunc::Identity,
            TransformFunc::Log,
            TransformFunc::Log10,
            TransformFunc::Log2,
            TransformFunc::symlog10(2.0),
            TransformFunc::Pseudolog10,
        ];
        for f in &funcs {
            for x in [0.5, 1.0, 3.0, 250.0] {
                let back = f.inverse(f.apply(x)).unwrap();
                assert!(close(back, x), "{} round trip of {x} gave {back}", f.name());
            }
        }
    }

    #[test]
    fn symlog_is_linear_near_zero_and_odd() {
        let f = TransformFunc::symlog10(10.0);
        assert!(close(f.apply(5.0), 0.5));
        assert!(close(f.apply(-5.0), -0.5));
        assert!(close(f.apply(100.0), 2.0));
        assert!(close(f.apply(-100.0), -2.0));
        assert!(close(f.inverse(-2.0).unwrap(), -100.0));
    }

    #[test]
    fn log_domain() {
        assert!(!TransformFunc::Log10.in_domain(0.0));
        assert!(TransformFunc::Log10.apply(-1.0).is_nan());
        assert!(TransformFunc::Pseudolog10.in_domain(-1.0));
        assert!(!TransformFunc::Identity.in_domain(f64::NAN));
    }

    #[test]
    fn custom_without_inverse() {
        let square = TransformFunc::custom("square", |x| x * x);
        assert_eq!(square.name(), "square");
        assert_eq!(square.apply(3.0), 9.0);
        assert_eq!(square.inverse(9.0), None);

        let cube = TransformFunc::Custom(CustomTransform::new("cube", |x| x * x * x).with_inverse(f64::cbrt));
        assert!(close(cube.inverse(27.0).unwrap(), 3.0));
        assert_eq!(square.clone(), square);
        assert_ne!(square, cube);
    }

    #[test]
    fn axis_transforms_only_touch_their_axis() {
        let t = AxisTransforms::xy(TransformFunc::Identity, TransformFunc::Log10);
        let p = t.apply(Vec3::new(5.0, 100.0, 7.0));
        assert_eq!(p.x, 5.0);
        assert!((p.y - 2.0).abs() < 1e-6);
        assert_eq!(p.z, 7.0);
        let back = t.inverse(p).unwrap();
        assert!((back.y - 100.0).abs() < 1e-3);
    }
}
