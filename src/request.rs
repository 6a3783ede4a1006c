//! Maps a property row to the party composition its scrape job should carry.

use crate::config::OccupancyConfig;
use crate::error::Error;
use crate::models::{OccupancyRequest, PropertyRow};

/// Dummy occupant used for categories without fixed room configurations.
const SINGLE_OCCUPANT: OccupancyRequest = OccupancyRequest {
    adults: 1,
    children: 0,
};

/// Derive the occupancy for one property.
///
/// Apartments and mobile homes always resolve to a single occupant; for
/// everything else the configured room-type table decides. A room type
/// missing from the table is a configuration error, not a default.
pub fn build_request(
    row: &PropertyRow,
    occupancy: &OccupancyConfig,
) -> Result<OccupancyRequest, Error> {
    if !row.property_category.has_room_variants() {
        return Ok(SINGLE_OCCUPANT);
    }

    occupancy
        .lookup(&row.room_type)
        .ok_or_else(|| Error::UnknownRoomType(row.room_type.label().to_string()))
}
