#![forbid(unsafe_code)]

//! The headless map widget.
//!
//! # Design
//!
//! [`MapView`] is a cheap handle (`Rc`) over the map state: camera, overlays,
//! selection, info window, device location, and the display toggles. It
//! renders nothing. Gesture methods (`tap_marker`, `pan`, ...) stand in for
//! the touch toolkit; they emit the named event sources, consult the delegate
//! hooks, and apply the default behavior when a hook does not consume the
//! gesture.
//!
//! Every write goes through validation and fails with [`BindError`], so the
//! setters returned by `*_setter()` plug directly into
//! [`Scope::bind`](rxmap_reactive::Scope::bind). Setters hold the map weakly.
//!
//! # Invariants
//!
//! 1. `current_selection()` is `None` or the id of a marker on this map.
//! 2. An info window is open exactly when a marker is selected.
//! 3. A camera change emits `will_move`, then `did_change_position`, then
//!    `idle_at_position`; an equal camera emits nothing.
//! 4. Location fixes are applied only while `my_location_enabled` is true.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use rxmap_reactive::{BindError, Property, Stream, Subscription};

use crate::delegate::HookSlot;
use crate::error::GestureError;
use crate::events::MapEvents;
use crate::geometry::{CameraPosition, Coordinate, Location};
use crate::overlay::{
    Circle, CircleOptions, InfoContent, InfoWindow, Marker, MarkerId, MarkerOptions, OverlayId,
    Poi, WillMove,
};
use crate::selection::Restyle;

type TapMarkerHook = dyn FnMut(&Marker) -> bool;
type InfoWindowHook = dyn FnMut(&Marker) -> Option<InfoContent>;
type MyLocationButtonHook = dyn FnMut() -> bool;

struct Delegates {
    tap_marker: HookSlot<TapMarkerHook>,
    marker_info_window: HookSlot<InfoWindowHook>,
    tap_my_location_button: HookSlot<MyLocationButtonHook>,
}

pub(crate) struct MapInner {
    pub(crate) events: MapEvents,
    camera: Property<CameraPosition>,
    my_location_enabled: Property<bool>,
    my_location_button: Property<bool>,
    traffic_enabled: Property<bool>,
    zoom_gestures_enabled: Property<bool>,
    my_location: Property<Option<Location>>,
    selected_marker: Property<Option<MarkerId>>,
    markers: Rc<RefCell<BTreeMap<MarkerId, Marker>>>,
    circles: RefCell<BTreeMap<OverlayId, Circle>>,
    info_window: RefCell<Option<InfoWindow>>,
    delegates: Delegates,
    next_id: Cell<u32>,
}

impl Drop for MapInner {
    fn drop(&mut self) {
        self.events.complete_all();
    }
}

/// Handle to a headless map. Clones share the same map.
#[derive(Clone)]
pub struct MapView {
    pub(crate) inner: Rc<MapInner>,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}

impl MapView {
    #[must_use]
    pub fn new() -> Self {
        let markers: Rc<RefCell<BTreeMap<MarkerId, Marker>>> = Rc::default();
        let known = Rc::clone(&markers);
        Self {
            inner: Rc::new(MapInner {
                events: MapEvents::new(),
                camera: Property::new("camera", CameraPosition::default())
                    .with_validator(CameraPosition::validate),
                my_location_enabled: Property::new("my_location_enabled", false),
                my_location_button: Property::new("my_location_button", false),
                traffic_enabled: Property::new("traffic_enabled", false),
                zoom_gestures_enabled: Property::new("zoom_gestures_enabled", true),
                my_location: Property::new("my_location", None),
                selected_marker: Property::new("selected_marker", None).with_validator(
                    move |selected: &Option<MarkerId>| match selected {
                        Some(id) if !known.borrow().contains_key(id) => {
                            Err(format!("no marker {id} on this map"))
                        }
                        _ => Ok(()),
                    },
                ),
                markers,
                circles: RefCell::new(BTreeMap::new()),
                info_window: RefCell::new(None),
                delegates: Delegates {
                    tap_marker: HookSlot::new(),
                    marker_info_window: HookSlot::new(),
                    tap_my_location_button: HookSlot::new(),
                },
                next_id: Cell::new(0),
            }),
        }
    }

    fn next_id(&self) -> u32 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    /// Wrap `apply` into a bindable setter that holds the map weakly.
    fn setter<T: 'static>(
        &self,
        target: &'static str,
        apply: fn(&MapView, T) -> Result<(), BindError>,
    ) -> impl FnMut(T) -> Result<(), BindError> + 'static {
        let map: Weak<MapInner> = Rc::downgrade(&self.inner);
        move |value| match map.upgrade() {
            Some(inner) => apply(&MapView { inner }, value),
            None => Err(BindError::new(target, "map view was released")),
        }
    }

    // -- Display toggles ---------------------------------------------------

    /// Whether the device location is shown (and tracked).
    pub fn my_location_enabled(&self) -> &Property<bool> {
        &self.inner.my_location_enabled
    }

    /// Whether the my-location button is shown.
    pub fn my_location_button(&self) -> &Property<bool> {
        &self.inner.my_location_button
    }

    pub fn traffic_enabled(&self) -> &Property<bool> {
        &self.inner.traffic_enabled
    }

    pub fn zoom_gestures_enabled(&self) -> &Property<bool> {
        &self.inner.zoom_gestures_enabled
    }

    // -- Camera ------------------------------------------------------------

    /// Current camera, then every change.
    #[must_use]
    pub fn camera(&self) -> Stream<CameraPosition> {
        self.inner.camera.stream()
    }

    #[must_use]
    pub fn current_camera(&self) -> CameraPosition {
        self.inner.camera.get()
    }

    pub fn set_camera(&self, camera: CameraPosition) -> Result<(), BindError> {
        self.move_camera(camera, false)
    }

    /// Keep the target and orientation, change the zoom.
    pub fn animate_to_zoom(&self, zoom: f32) -> Result<(), BindError> {
        self.move_camera(self.current_camera().with_zoom(zoom), false)
    }

    /// Move to `camera`. The move completes immediately.
    pub fn animate_to(&self, camera: CameraPosition) -> Result<(), BindError> {
        self.move_camera(camera, false)
    }

    pub fn camera_setter(&self) -> impl FnMut(CameraPosition) -> Result<(), BindError> + 'static {
        self.setter("camera", MapView::set_camera)
    }

    pub fn zoom_to_animate(&self) -> impl FnMut(f32) -> Result<(), BindError> + 'static {
        self.setter("zoom_to_animate", MapView::animate_to_zoom)
    }

    pub fn camera_to_animate(&self) -> impl FnMut(CameraPosition) -> Result<(), BindError> + 'static {
        self.setter("camera_to_animate", MapView::animate_to)
    }

    fn move_camera(&self, camera: CameraPosition, by_gesture: bool) -> Result<(), BindError> {
        camera
            .validate()
            .map_err(|reason| BindError::new("camera", reason))?;
        if self.inner.camera.get() == camera {
            return Ok(());
        }
        let events = &self.inner.events;
        events.will_move.next(WillMove { by_gesture });
        self.inner.camera.set(camera)?;
        events.did_change_position.next(camera);
        events.idle_at_position.next(camera);
        Ok(())
    }

    // -- Overlays ----------------------------------------------------------

    pub fn add_marker(&self, options: MarkerOptions) -> Result<Marker, BindError> {
        options
            .position
            .validate()
            .map_err(|reason| BindError::new("marker position", reason))?;
        if !options.rotation.is_finite() {
            return Err(BindError::new("marker rotation", "rotation is not finite"));
        }
        let marker = Marker::new(MarkerId(self.next_id()), options);
        self.inner
            .markers
            .borrow_mut()
            .insert(marker.id(), marker.clone());
        #[cfg(feature = "tracing")]
        tracing::debug!(marker = %marker.id(), title = marker.title(), "marker added");
        Ok(marker)
    }

    pub fn add_circle(&self, options: CircleOptions) -> Result<Circle, BindError> {
        options
            .position
            .validate()
            .map_err(|reason| BindError::new("circle position", reason))?;
        if !(options.radius.is_finite() && options.radius > 0.0) {
            return Err(BindError::new(
                "circle radius",
                format!("radius {} must be positive", options.radius),
            ));
        }
        options
            .fill_color
            .validate()
            .and_then(|()| options.stroke_color.validate())
            .map_err(|reason| BindError::new("circle color", reason))?;
        let circle = Circle::new(OverlayId(self.next_id()), options);
        self.inner
            .circles
            .borrow_mut()
            .insert(circle.id(), circle.clone());
        Ok(circle)
    }

    #[must_use]
    pub fn marker(&self, id: MarkerId) -> Option<Marker> {
        self.inner.markers.borrow().get(&id).cloned()
    }

    /// Markers in placement order.
    #[must_use]
    pub fn markers(&self) -> Vec<Marker> {
        self.inner.markers.borrow().values().cloned().collect()
    }

    #[must_use]
    pub fn circle(&self, id: OverlayId) -> Option<Circle> {
        self.inner.circles.borrow().get(&id).cloned()
    }

    #[must_use]
    pub fn circles(&self) -> Vec<Circle> {
        self.inner.circles.borrow().values().cloned().collect()
    }

    /// Apply one selection restyle to its marker's icon.
    pub fn restyle(&self, restyle: Restyle) -> Result<(), BindError> {
        let marker = self.marker(restyle.marker).ok_or_else(|| {
            BindError::new("marker icon", format!("no marker {}", restyle.marker))
        })?;
        marker.icon().set(restyle.icon)
    }

    // -- Selection and info window ----------------------------------------

    /// Current selection, then every change.
    #[must_use]
    pub fn selected_marker(&self) -> Stream<Option<MarkerId>> {
        self.inner.selected_marker.stream()
    }

    #[must_use]
    pub fn current_selection(&self) -> Option<MarkerId> {
        self.inner.selected_marker.get()
    }

    /// Select a marker (opening its info window) or clear the selection
    /// (closing it).
    pub fn set_selected_marker(&self, selected: Option<MarkerId>) -> Result<(), BindError> {
        let previous = self.inner.selected_marker.get();
        if previous == selected {
            return Ok(());
        }
        self.inner.selected_marker.set(selected)?;
        // A subscriber may have reselected during the write; that nested
        // call already moved the info window to the newer marker.
        if self.inner.selected_marker.get() != selected {
            return Ok(());
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(?previous, ?selected, "selection changed");

        let closed = self.inner.info_window.borrow_mut().take();
        if let Some(window) = closed {
            self.inner.events.did_close_info_window.next(window.marker);
        }
        if let Some(marker) = selected.and_then(|id| self.marker(id)) {
            self.open_info_window(&marker);
        }
        Ok(())
    }

    pub fn selected_marker_setter(
        &self,
    ) -> impl FnMut(Option<MarkerId>) -> Result<(), BindError> + 'static {
        self.setter("selected_marker", MapView::set_selected_marker)
    }

    fn open_info_window(&self, marker: &Marker) {
        let content = self
            .inner
            .delegates
            .marker_info_window
            .call(|hook| hook(marker))
            .flatten()
            .unwrap_or_else(|| InfoContent::Title(marker.title().to_string()));
        *self.inner.info_window.borrow_mut() = Some(InfoWindow {
            marker: marker.id(),
            content,
        });
    }

    #[must_use]
    pub fn info_window(&self) -> Option<InfoWindow> {
        self.inner.info_window.borrow().clone()
    }

    // -- Device location ---------------------------------------------------

    /// Current location fix (`None` until one arrives), then every change.
    #[must_use]
    pub fn my_location(&self) -> Stream<Option<Location>> {
        self.inner.my_location.stream()
    }

    #[must_use]
    pub fn current_location(&self) -> Option<Location> {
        self.inner.my_location.get()
    }

    /// Deliver a location fix from the positioning system.
    pub fn update_location(&self, location: Option<Location>) -> Result<(), GestureError> {
        if !self.inner.my_location_enabled.get() {
            return Err(GestureError::Unavailable("my location"));
        }
        if let Some(fix) = &location {
            fix.coordinate
                .validate()
                .map_err(|reason| BindError::new("my_location", reason))?;
        }
        self.inner.my_location.set(location)?;
        Ok(())
    }

    // -- Delegate hooks ----------------------------------------------------

    /// Decide whether a marker tap is consumed. Returning `false` runs the
    /// default: select the marker and open its info window. Disposing the
    /// returned subscription uninstalls the hook.
    pub fn handle_tap_marker(&self, hook: impl FnMut(&Marker) -> bool + 'static) -> Subscription {
        let generation = self.inner.delegates.tap_marker.install(Box::new(hook));
        let map = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = map.upgrade() {
                inner.delegates.tap_marker.remove(generation);
            }
        })
    }

    /// Provide info-window content. `None` falls back to the title window.
    pub fn handle_marker_info_window(
        &self,
        hook: impl FnMut(&Marker) -> Option<InfoContent> + 'static,
    ) -> Subscription {
        let generation = self
            .inner
            .delegates
            .marker_info_window
            .install(Box::new(hook));
        let map = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = map.upgrade() {
                inner.delegates.marker_info_window.remove(generation);
            }
        })
    }

    /// Decide whether a my-location-button tap is consumed. Returning `false`
    /// runs the default: center the camera on the device location, if known.
    pub fn handle_tap_my_location_button(
        &self,
        hook: impl FnMut() -> bool + 'static,
    ) -> Subscription {
        let generation = self
            .inner
            .delegates
            .tap_my_location_button
            .install(Box::new(hook));
        let map = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = map.upgrade() {
                inner.delegates.tap_my_location_button.remove(generation);
            }
        })
    }

    // -- Gestures ----------------------------------------------------------

    /// Tap on empty map: closes the info window and clears the selection.
    pub fn tap_at(&self, coordinate: Coordinate) -> Result<(), GestureError> {
        coordinate
            .validate()
            .map_err(|reason| BindError::new("tap", reason))?;
        self.inner.events.did_tap_at.next(coordinate);
        self.set_selected_marker(None)?;
        Ok(())
    }

    pub fn long_press_at(&self, coordinate: Coordinate) -> Result<(), GestureError> {
        coordinate
            .validate()
            .map_err(|reason| BindError::new("long press", reason))?;
        self.inner.events.did_long_press_at.next(coordinate);
        Ok(())
    }

    pub fn tap_marker(&self, id: MarkerId) -> Result<(), GestureError> {
        let marker = self.marker(id).ok_or(GestureError::UnknownMarker(id))?;
        self.inner.events.did_tap_marker.next(id);
        let consumed = self
            .inner
            .delegates
            .tap_marker
            .call(|hook| hook(&marker))
            .unwrap_or(false);
        #[cfg(feature = "tracing")]
        tracing::debug!(marker = %id, consumed, "marker tap");
        if !consumed {
            self.set_selected_marker(Some(id))?;
        }
        Ok(())
    }

    fn open_window_marker(&self) -> Result<MarkerId, GestureError> {
        self.inner
            .info_window
            .borrow()
            .as_ref()
            .map(|window| window.marker)
            .ok_or(GestureError::NoInfoWindow)
    }

    pub fn tap_info_window(&self) -> Result<(), GestureError> {
        let marker = self.open_window_marker()?;
        self.inner.events.did_tap_info_window.next(marker);
        Ok(())
    }

    pub fn long_press_info_window(&self) -> Result<(), GestureError> {
        let marker = self.open_window_marker()?;
        self.inner.events.did_long_press_info_window.next(marker);
        Ok(())
    }

    /// Close the open info window, which also clears the selection.
    pub fn close_info_window(&self) -> Result<(), GestureError> {
        self.open_window_marker()?;
        self.set_selected_marker(None)?;
        Ok(())
    }

    pub fn tap_overlay(&self, id: OverlayId) -> Result<(), GestureError> {
        let circle = self.circle(id).ok_or(GestureError::UnknownOverlay(id))?;
        if !circle.is_tappable() {
            return Err(GestureError::NotTappable(id));
        }
        self.inner.events.did_tap_overlay.next(id);
        Ok(())
    }

    pub fn tap_poi(&self, poi: Poi) -> Result<(), GestureError> {
        poi.coordinate
            .validate()
            .map_err(|reason| BindError::new("poi", reason))?;
        self.inner.events.did_tap_poi.next(poi);
        Ok(())
    }

    pub fn tap_my_location_button(&self) -> Result<(), GestureError> {
        if !self.inner.my_location_button.get() {
            return Err(GestureError::Unavailable("my location button"));
        }
        self.inner.events.did_tap_my_location_button.next(());
        let consumed = self
            .inner
            .delegates
            .tap_my_location_button
            .call(|hook| hook())
            .unwrap_or(false);
        if !consumed && let Some(fix) = self.current_location() {
            self.move_camera(self.current_camera().with_target(fix.coordinate), false)?;
        }
        Ok(())
    }

    /// Drag the camera target to `target`.
    pub fn pan(&self, target: Coordinate) -> Result<(), GestureError> {
        self.move_camera(self.current_camera().with_target(target), true)?;
        Ok(())
    }

    /// Pinch to `zoom`. Requires zoom gestures.
    pub fn pinch(&self, zoom: f32) -> Result<(), GestureError> {
        if !self.inner.zoom_gestures_enabled.get() {
            return Err(GestureError::Unavailable("zoom gestures"));
        }
        self.move_camera(self.current_camera().with_zoom(zoom), true)?;
        Ok(())
    }

    /// Long-press a draggable marker and move it through `path`.
    pub fn drag_marker(&self, id: MarkerId, path: &[Coordinate]) -> Result<(), GestureError> {
        let marker = self.marker(id).ok_or(GestureError::UnknownMarker(id))?;
        if !marker.is_draggable() {
            return Err(GestureError::NotDraggable(id));
        }
        for point in path {
            point
                .validate()
                .map_err(|reason| BindError::new("marker position", reason))?;
        }
        let events = &self.inner.events;
        events.did_begin_dragging_marker.next(id);
        for point in path {
            marker.position().set(*point)?;
            events.did_drag_marker.next(id);
        }
        events.did_end_dragging_marker.next(id);
        Ok(())
    }

    /// One render pass: tiles load, then a snapshot is available.
    pub fn render_frame(&self) {
        let events = &self.inner.events;
        events.did_start_tile_rendering.next(());
        events.did_finish_tile_rendering.next(());
        events.snapshot_ready.next(());
    }

    // -- Diagnostics -------------------------------------------------------

    /// Live subscriptions on every source and property of this map.
    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        let inner = &self.inner;
        let toggles = [
            &inner.my_location_enabled,
            &inner.my_location_button,
            &inner.traffic_enabled,
            &inner.zoom_gestures_enabled,
        ]
        .iter()
        .map(|p| p.subscriber_count())
        .sum::<usize>();
        let markers = inner
            .markers
            .borrow()
            .values()
            .map(|m| {
                m.position().subscriber_count()
                    + m.icon().subscriber_count()
                    + m.rotation().subscriber_count()
            })
            .sum::<usize>();
        let circles = inner
            .circles
            .borrow()
            .values()
            .map(|c| c.fill_color().subscriber_count())
            .sum::<usize>();
        inner.events.subscriber_count()
            + toggles
            + inner.camera.subscriber_count()
            + inner.my_location.subscriber_count()
            + inner.selected_marker.subscriber_count()
            + markers
            + circles
    }

    /// Whether any delegate hook is installed.
    #[must_use]
    pub fn has_delegates(&self) -> bool {
        let delegates = &self.inner.delegates;
        delegates.tap_marker.is_installed()
            || delegates.marker_info_window.is_installed()
            || delegates.tap_my_location_button.is_installed()
    }
}

impl fmt::Debug for MapView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapView")
            .field("camera", &self.current_camera())
            .field("markers", &self.inner.markers.borrow().len())
            .field("circles", &self.inner.circles.borrow().len())
            .field("selected", &self.current_selection())
            .finish_non_exhaustive()
    }
}
