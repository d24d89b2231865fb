#![forbid(unsafe_code)]

//! Named event sources of a [`MapView`].
//!
//! Each source is a private [`Subject`] named after its accessor. Consumers
//! only see the [`Stream`] side; the map emits from its gesture and camera
//! code.

use rxmap_reactive::{Stream, Subject};

use crate::MapView;
use crate::geometry::{CameraPosition, Coordinate};
use crate::overlay::{MarkerId, OverlayId, Poi, WillMove};

macro_rules! event_sources {
    ($( $(#[$doc:meta])* $name:ident: $payload:ty; )*) => {
        pub(crate) struct MapEvents {
            $( pub(crate) $name: Subject<$payload>, )*
        }

        impl MapEvents {
            pub(crate) fn new() -> Self {
                Self {
                    $( $name: Subject::named(stringify!($name)), )*
                }
            }

            pub(crate) fn subscriber_count(&self) -> usize {
                0 $( + self.$name.subscriber_count() )*
            }

            pub(crate) fn complete_all(&self) {
                $( self.$name.complete(); )*
            }
        }

        impl MapView {
            $(
                $(#[$doc])*
                #[must_use]
                pub fn $name(&self) -> Stream<$payload> {
                    self.inner.events.$name.stream()
                }
            )*
        }
    };
}

event_sources! {
    /// The camera is about to move.
    will_move: WillMove;
    /// The camera moved.
    did_change_position: CameraPosition;
    /// The camera settled after a move.
    idle_at_position: CameraPosition;
    did_tap_at: Coordinate;
    did_long_press_at: Coordinate;
    did_tap_marker: MarkerId;
    did_tap_info_window: MarkerId;
    did_long_press_info_window: MarkerId;
    did_close_info_window: MarkerId;
    /// A tappable non-marker overlay was tapped.
    did_tap_overlay: OverlayId;
    did_tap_poi: Poi;
    did_tap_my_location_button: ();
    did_begin_dragging_marker: MarkerId;
    did_drag_marker: MarkerId;
    did_end_dragging_marker: MarkerId;
    did_start_tile_rendering: ();
    did_finish_tile_rendering: ();
    snapshot_ready: ();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxmap_reactive::Operator;

    #[test]
    fn sources_are_named_after_accessors() {
        let map = MapView::new();
        assert_eq!(
            map.did_tap_marker().operators(),
            &[Operator::Source("did_tap_marker".into())]
        );
        assert_eq!(
            map.snapshot_ready().operators(),
            &[Operator::Source("snapshot_ready".into())]
        );
    }

    #[test]
    fn subscriber_count_sums_sources() {
        let map = MapView::new();
        let _a = map.did_tap_at().subscribe(|_| {});
        let _b = map.will_move().subscribe(|_| {});
        assert_eq!(map.inner.events.subscriber_count(), 2);
    }
}
