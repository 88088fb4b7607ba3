//! Per-object kinematic state and the wire encoding described in §3 and §6.

use crate::vector::{Quat, Vec3};

/// The number of `f64` components in the canonical flat wire encoding.
pub const WIRE_FLOAT_COUNT: usize = 21;

/// Complete kinematic + shape state for one object (§3).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectState {
    /// Bounding sphere radius, also used as the AABB half-extent.
    pub radius: f64,
    /// Uniform geometry scale, independent of `radius`.
    pub scale: f64,
    /// 0 means immovable (infinite mass); positive otherwise.
    pub inverse_mass: f64,
    /// Restitution coefficient in `[0, 1]`.
    pub restitution: f64,
    /// Unit quaternion, scalar part last.
    pub orientation: Quat,
    pub position: Vec3,
    pub velocity_linear: Vec3,
    pub velocity_angular: Vec3,
    /// Shape family + parameters, a 4-vector tag.
    pub collision_shape: [f64; 4],
    /// Monotonic version counter, bumped whenever geometry/shape changes.
    pub last_changed: u64,
}

impl ObjectState {
    /// Equality that ignores `collision_shape` and uses component-wise
    /// closeness (1e-9) for every other field, per §3.
    pub fn kinematically_close(&self, other: &ObjectState) -> bool {
        close(self.radius, other.radius)
            && close(self.scale, other.scale)
            && close(self.inverse_mass, other.inverse_mass)
            && close(self.restitution, other.restitution)
            && self.orientation.is_close(&other.orientation)
            && self.position.is_close(&other.position)
            && self.velocity_linear.is_close(&other.velocity_linear)
            && self.velocity_angular.is_close(&other.velocity_angular)
            && self.last_changed == other.last_changed
    }

    /// Returns true if this object cannot move (infinite mass).
    pub fn is_immovable(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// Encodes this state as the canonical 21-element flat `f64` array:
    /// `[radius, scale, inverse_mass, restitution, orientation(4),
    /// position(3), velocity_linear(3), velocity_angular(3),
    /// collision_shape(4)]`.
    pub fn to_wire_floats(&self) -> [f64; WIRE_FLOAT_COUNT] {
        let mut out = [0.0; WIRE_FLOAT_COUNT];
        out[0] = self.radius;
        out[1] = self.scale;
        out[2] = self.inverse_mass;
        out[3] = self.restitution;
        out[4..8].copy_from_slice(&self.orientation.to_array());
        out[8..11].copy_from_slice(&self.position.to_array());
        out[11..14].copy_from_slice(&self.velocity_linear.to_array());
        out[14..17].copy_from_slice(&self.velocity_angular.to_array());
        out[17..21].copy_from_slice(&self.collision_shape);
        out
    }

    /// Decodes a state from the canonical 21-element flat `f64` array.
    pub fn from_wire_floats(a: [f64; WIRE_FLOAT_COUNT]) -> Self {
        Self {
            radius: a[0],
            scale: a[1],
            inverse_mass: a[2],
            restitution: a[3],
            orientation: Quat::from_array([a[4], a[5], a[6], a[7]]),
            position: Vec3::from_array([a[8], a[9], a[10]]),
            velocity_linear: Vec3::from_array([a[11], a[12], a[13]]),
            velocity_angular: Vec3::from_array([a[14], a[15], a[16]]),
            collision_shape: [a[17], a[18], a[19], a[20]],
            last_changed: 0,
        }
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < crate::vector::CLOSE_EPSILON
}

/// A field that is either left untouched (`Keep`) or replaced with a new
/// value (`Replace`). Used by [`StateOverride`] instead of a bare
/// `Option<T>` so a legitimate zero value can never be mistaken for "no
/// change" (§9).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Field<T> {
    Keep,
    Replace(T),
}

impl<T> Field<T> {
    /// Applies this field to `current`, returning the replacement if set.
    pub fn apply(self, current: T) -> T {
        match self {
            Field::Keep => current,
            Field::Replace(v) => v,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Field::Keep)
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Keep
    }
}

/// A partial object state: every field is either `Keep` or `Replace` (§3, §9).
/// An override with every field `Replace` is equivalent to a full
/// replacement.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StateOverride {
    pub radius: Field<f64>,
    pub scale: Field<f64>,
    pub inverse_mass: Field<f64>,
    pub restitution: Field<f64>,
    pub orientation: Field<Quat>,
    pub position: Field<Vec3>,
    pub velocity_linear: Field<Vec3>,
    pub velocity_angular: Field<Vec3>,
    pub collision_shape: Field<[f64; 4]>,
}

impl StateOverride {
    /// Applies this override onto `base`, returning the resulting state.
    /// `last_changed` is bumped by the caller (the store), not here, since
    /// only geometry/shape changes bump it (§3).
    pub fn apply(&self, base: ObjectState) -> ObjectState {
        ObjectState {
            radius: self.radius.apply(base.radius),
            scale: self.scale.apply(base.scale),
            inverse_mass: self.inverse_mass.apply(base.inverse_mass),
            restitution: self.restitution.apply(base.restitution),
            orientation: self.orientation.apply(base.orientation),
            position: self.position.apply(base.position),
            velocity_linear: self.velocity_linear.apply(base.velocity_linear),
            velocity_angular: self.velocity_angular.apply(base.velocity_angular),
            collision_shape: self.collision_shape.apply(base.collision_shape),
            last_changed: base.last_changed,
        }
    }

    /// Returns true if this override touches geometry or shape fields
    /// (`radius`, `scale`, or `collision_shape`) — the fields that bump
    /// `last_changed` per §3.
    pub fn touches_geometry(&self) -> bool {
        !self.radius.is_keep() || !self.scale.is_keep() || !self.collision_shape.is_keep()
    }
}
