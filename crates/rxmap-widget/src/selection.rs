#![forbid(unsafe_code)]

//! Selection restyling as a pure diff.

use crate::overlay::{MarkerIcon, MarkerId};

/// One icon change caused by a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restyle {
    pub marker: MarkerId,
    pub icon: MarkerIcon,
}

/// Icon changes for a selection moving from `prev` to `cur`: the previous
/// marker returns to [`MarkerIcon::Normal`] before the current one becomes
/// [`MarkerIcon::Selected`].
#[must_use]
pub fn style_diff(prev: Option<MarkerId>, cur: Option<MarkerId>) -> Vec<Restyle> {
    let deselect = prev.map(|marker| Restyle {
        marker,
        icon: MarkerIcon::Normal,
    });
    let select = cur.map(|marker| Restyle {
        marker,
        icon: MarkerIcon::Selected,
    });
    deselect.into_iter().chain(select).collect()
}
