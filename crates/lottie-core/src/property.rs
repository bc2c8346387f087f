use std::fmt;

use glam::Vec3;

use crate::animatable::{Interpolatable, KeyframeTrack};

/// Source of a property's value over time.
///
/// Implementations must be pure: the same frame always yields the same value.
pub trait ValueProvider<T>: Send + Sync {
    fn value_at(&self, frame: f32) -> T;

    /// Whether the value may differ between the two frames.
    fn has_update(&self, from: f32, to: f32) -> bool;
}

/// Evaluates a [`KeyframeTrack`].
#[derive(Debug, Clone)]
pub struct KeyframeInterpolator<T> {
    track: KeyframeTrack<T>,
}

impl<T: Interpolatable> KeyframeInterpolator<T> {
    pub fn new(track: KeyframeTrack<T>) -> Self {
        Self { track }
    }

    pub fn track(&self) -> &KeyframeTrack<T> {
        &self.track
    }
}

impl<T: Interpolatable + Send + Sync> ValueProvider<T> for KeyframeInterpolator<T> {
    fn value_at(&self, frame: f32) -> T {
        self.track.value_at(frame)
    }

    fn has_update(&self, from: f32, to: f32) -> bool {
        self.track.has_update(from, to)
    }
}

/// A fixed value, used for runtime overrides.
#[derive(Debug, Clone)]
pub struct SingleValueProvider<T> {
    value: T,
}

impl<T> SingleValueProvider<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + Send + Sync> ValueProvider<T> for SingleValueProvider<T> {
    fn value_at(&self, _frame: f32) -> T {
        self.value.clone()
    }

    fn has_update(&self, _from: f32, _to: f32) -> bool {
        false
    }
}

/// A provider plus the value it produced for the last requested frame.
pub struct NodeProperty<T> {
    provider: Box<dyn ValueProvider<T>>,
    last_frame: Option<f32>,
    last_value: T,
    provider_changed: bool,
}

impl<T: Interpolatable + Send + Sync + 'static> NodeProperty<T> {
    pub fn new(track: KeyframeTrack<T>) -> Self {
        Self::with_provider(Box::new(KeyframeInterpolator::new(track)))
    }

    pub fn with_provider(provider: Box<dyn ValueProvider<T>>) -> Self {
        Self {
            provider,
            last_frame: None,
            last_value: T::default(),
            provider_changed: false,
        }
    }
}

impl<T: Clone> NodeProperty<T> {
    /// Value at `frame`, evaluating the provider only when `frame` differs
    /// from the cached one.
    pub fn value(&mut self, frame: f32) -> T {
        if self.last_frame == Some(frame) && !self.provider_changed {
            return self.last_value.clone();
        }

        self.last_value = self.provider.value_at(frame);
        self.last_frame = Some(frame);
        self.provider_changed = false;
        self.last_value.clone()
    }

    /// Last evaluated value, if any frame has been evaluated.
    pub fn cached_value(&self) -> Option<&T> {
        self.last_frame.map(|_| &self.last_value)
    }

    pub fn last_frame(&self) -> Option<f32> {
        self.last_frame
    }

    pub fn needs_update(&self, frame: f32) -> bool {
        match self.last_frame {
            None => true,
            Some(_) if self.provider_changed => true,
            Some(last) => self.provider.has_update(last, frame),
        }
    }

    /// Replaces the value source. The cached value is stale from here on.
    pub fn set_provider(&mut self, provider: Box<dyn ValueProvider<T>>) {
        self.provider = provider;
        self.provider_changed = true;
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeProperty")
            .field("last_frame", &self.last_frame)
            .field("last_value", &self.last_value)
            .field("provider_changed", &self.provider_changed)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Vector,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Scalar => f.write_str("scalar"),
            ValueKind::Vector => f.write_str("vector"),
        }
    }
}

/// Untyped property value exchanged with keypath tooling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    Scalar(f32),
    Vector(Vec3),
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Scalar(_) => ValueKind::Scalar,
            PropertyValue::Vector(_) => ValueKind::Vector,
        }
    }
}

pub trait ToPropertyValue: Sized {
    const KIND: ValueKind;

    fn to_property_value(&self) -> PropertyValue;
    fn from_property_value(value: &PropertyValue) -> Option<Self>;
}

impl ToPropertyValue for f32 {
    const KIND: ValueKind = ValueKind::Scalar;

    fn to_property_value(&self) -> PropertyValue {
        PropertyValue::Scalar(*self)
    }

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Scalar(v) => Some(*v),
            PropertyValue::Vector(_) => None,
        }
    }
}

impl ToPropertyValue for Vec3 {
    const KIND: ValueKind = ValueKind::Vector;

    fn to_property_value(&self) -> PropertyValue {
        PropertyValue::Vector(*self)
    }

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Vector(v) => Some(*v),
            PropertyValue::Scalar(_) => None,
        }
    }
}

/// Object-safe view over [`NodeProperty`] regardless of value type.
pub trait AnyNodeProperty {
    fn value_kind(&self) -> ValueKind;

    fn cached_value(&self) -> Option<PropertyValue>;

    fn needs_update(&self, frame: f32) -> bool;

    /// Pins the property to `value`. Fails with the expected kind when the
    /// value has the wrong shape.
    fn set_value(&mut self, value: PropertyValue) -> Result<(), ValueKind>;
}

impl<T> AnyNodeProperty for NodeProperty<T>
where
    T: Interpolatable + ToPropertyValue + Send + Sync + 'static,
{
    fn value_kind(&self) -> ValueKind {
        T::KIND
    }

    fn cached_value(&self) -> Option<PropertyValue> {
        NodeProperty::cached_value(self).map(ToPropertyValue::to_property_value)
    }

    fn needs_update(&self, frame: f32) -> bool {
        NodeProperty::needs_update(self, frame)
    }

    fn set_value(&mut self, value: PropertyValue) -> Result<(), ValueKind> {
        let typed = T::from_property_value(&value).ok_or(T::KIND)?;
        self.set_provider(Box::new(SingleValueProvider::new(typed)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animatable::TrackKeyframe;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    impl ValueProvider<f32> for CountingProvider {
        fn value_at(&self, frame: f32) -> f32 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            frame * 2.0
        }

        fn has_update(&self, from: f32, to: f32) -> bool {
            from != to
        }
    }

    fn counting_property() -> (NodeProperty<f32>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let prop = NodeProperty::with_provider(Box::new(CountingProvider {
            calls: Arc::clone(&calls),
        }));
        (prop, calls)
    }

    #[test]
    fn same_frame_reads_hit_the_cache() {
        let (mut prop, calls) = counting_property();

        assert_eq!(prop.value(3.0), 6.0);
        assert_eq!(prop.value(3.0), 6.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(prop.value(4.0), 8.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nothing_is_cached_before_first_read() {
        let (prop, calls) = counting_property();
        assert!(prop.cached_value().is_none());
        assert!(prop.last_frame().is_none());
        assert!(prop.needs_update(0.0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn needs_update_asks_provider_relative_to_cached_frame() {
        let mut prop = NodeProperty::new(KeyframeTrack::from_keyframes(vec![
            TrackKeyframe::hold(0.0, 1.0),
            TrackKeyframe::linear(10.0, 2.0),
        ]));

        prop.value(2.0);
        assert!(!prop.needs_update(2.0));
        assert!(!prop.needs_update(8.0));
        assert!(prop.needs_update(10.0));
    }

    #[test]
    fn override_invalidates_same_frame_cache() {
        let (mut prop, calls) = counting_property();
        assert_eq!(prop.value(5.0), 10.0);

        AnyNodeProperty::set_value(&mut prop, PropertyValue::Scalar(-1.0)).unwrap();
        assert!(prop.needs_update(5.0));
        assert_eq!(prop.value(5.0), -1.0);
        assert!(!prop.needs_update(5.0));
        assert!(!prop.needs_update(50.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_value_rejects_wrong_shape() {
        let mut prop = NodeProperty::new(KeyframeTrack::constant(Vec3::ONE));
        let err = AnyNodeProperty::set_value(&mut prop, PropertyValue::Scalar(1.0)).unwrap_err();
        assert_eq!(err, ValueKind::Vector);

        prop.value(0.0);
        assert_eq!(
            AnyNodeProperty::cached_value(&prop),
            Some(PropertyValue::Vector(Vec3::ONE))
        );
    }
}
