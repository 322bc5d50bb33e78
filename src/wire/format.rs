use std::collections::BTreeMap;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{MasklineError, MasklineResult};
use crate::region::event::{RegionEvent, RegionId};
use crate::region::geometry::Geometry;
use crate::region::log::RegionEventLog;

/// One serialized event record.
///
/// Records carry no explicit tag; the variant is chosen by the fields present. Variants
/// are tried top to bottom, so the plain `Create` shape must stay last.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum WireRecord {
    /// `{isRemovalMarker: true, removesRect: id}`
    #[serde(rename_all = "camelCase")]
    Tombstone {
        /// Must be `true`.
        is_removal_marker: bool,
        /// Deleted region id.
        removes_rect: String,
    },
    /// `{rectangleMoved: id, x, y, width, height}`
    #[serde(rename_all = "camelCase")]
    Move {
        /// Moved region id.
        rectangle_moved: String,
        /// Left edge.
        x: i32,
        /// Top edge.
        y: i32,
        /// Width.
        width: i32,
        /// Height.
        height: i32,
    },
    /// `{rectangleResized: id, x, y, width, height}`
    #[serde(rename_all = "camelCase")]
    Resize {
        /// Resized region id.
        rectangle_resized: String,
        /// Left edge.
        x: i32,
        /// Top edge.
        y: i32,
        /// Width.
        width: i32,
        /// Height.
        height: i32,
    },
    /// `{x, y, width, height, rectangleId}`; a missing id means `"<frame>_<position>"`.
    #[serde(rename_all = "camelCase")]
    Create {
        /// Left edge.
        x: i32,
        /// Top edge.
        y: i32,
        /// Width.
        width: i32,
        /// Height.
        height: i32,
        /// Created region id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rectangle_id: Option<String>,
    },
}

/// Serialized log: frame index (a string key in JSON) to that frame's records.
pub type WireLog = BTreeMap<u64, Vec<WireRecord>>;

fn record(ev: &RegionEvent) -> WireRecord {
    match *ev {
        RegionEvent::Create { id, geometry: g } => WireRecord::Create {
            x: g.x,
            y: g.y,
            width: g.width,
            height: g.height,
            rectangle_id: Some(id.to_string()),
        },
        RegionEvent::Move { target, geometry: g } => WireRecord::Move {
            rectangle_moved: target.to_string(),
            x: g.x,
            y: g.y,
            width: g.width,
            height: g.height,
        },
        RegionEvent::Resize { target, geometry: g } => WireRecord::Resize {
            rectangle_resized: target.to_string(),
            x: g.x,
            y: g.y,
            width: g.width,
            height: g.height,
        },
        RegionEvent::Tombstone { target } => WireRecord::Tombstone {
            is_removal_marker: true,
            removes_rect: target.to_string(),
        },
    }
}

/// Convert a log to its wire shape; records inside a frame are ordered by kind, then id.
pub fn encode(log: &RegionEventLog) -> WireLog {
    log.buckets()
        .map(|(frame, bucket)| {
            let mut events = bucket.events().to_vec();
            events.sort_by_key(|e| (e.kind(), e.target()));
            (frame.0, events.iter().map(record).collect())
        })
        .collect()
}

fn event(frame: FrameIndex, position: usize, rec: &WireRecord) -> MasklineResult<RegionEvent> {
    let parse = |s: &str| s.parse::<RegionId>();
    Ok(match rec {
        WireRecord::Tombstone {
            is_removal_marker,
            removes_rect,
        } => {
            if !is_removal_marker {
                return Err(MasklineError::serde(format!(
                    "frame {frame}: removal record for '{removes_rect}' has isRemovalMarker=false"
                )));
            }
            RegionEvent::Tombstone {
                target: parse(removes_rect)?,
            }
        }
        WireRecord::Move {
            rectangle_moved,
            x,
            y,
            width,
            height,
        } => RegionEvent::Move {
            target: parse(rectangle_moved)?,
            geometry: Geometry::new(*x, *y, *width, *height),
        },
        WireRecord::Resize {
            rectangle_resized,
            x,
            y,
            width,
            height,
        } => RegionEvent::Resize {
            target: parse(rectangle_resized)?,
            geometry: Geometry::new(*x, *y, *width, *height),
        },
        WireRecord::Create {
            x,
            y,
            width,
            height,
            rectangle_id,
        } => {
            let id = match rectangle_id {
                Some(s) => parse(s)?,
                None => {
                    let sequence = u32::try_from(position).map_err(|_| {
                        MasklineError::serde(format!("frame {frame}: too many records"))
                    })?;
                    RegionId::new(frame, sequence)
                }
            };
            if id.origin != frame {
                return Err(MasklineError::serde(format!(
                    "frame {frame}: create record for '{id}' belongs to frame {}",
                    id.origin
                )));
            }
            RegionEvent::Create {
                id,
                geometry: Geometry::new(*x, *y, *width, *height),
            }
        }
    })
}

/// Rebuild a log from its wire shape.
///
/// Empty frame lists are skipped. Duplicate move, resize or removal records for the same
/// `(frame, target)` keep the last one; a region created twice is an error. A region removed
/// on its own origin frame is dropped entirely.
pub fn decode(wire: &WireLog) -> MasklineResult<RegionEventLog> {
    let mut log = RegionEventLog::new();
    for (&frame, records) in wire {
        let frame = FrameIndex(frame);
        for (position, rec) in records.iter().enumerate() {
            let ev = event(frame, position, rec)?;
            if let RegionEvent::Create { id, .. } = ev
                && log.contains_region(id)
            {
                return Err(MasklineError::serde(format!(
                    "frame {frame}: region '{id}' is created more than once"
                )));
            }
            log.put_event(frame, ev);
        }
    }
    let purged = log.purge_origin_tombstones();
    if !purged.is_empty() {
        tracing::debug!(regions = purged.len(), "dropped regions removed at their origin");
    }
    Ok(log)
}

/// Serialize a log to JSON text.
pub fn encode_json(log: &RegionEventLog) -> MasklineResult<String> {
    serde_json::to_string_pretty(&encode(log)).map_err(|e| MasklineError::serde(e.to_string()))
}

/// Parse JSON text into a log.
pub fn decode_json(text: &str) -> MasklineResult<RegionEventLog> {
    let wire: WireLog =
        serde_json::from_str(text).map_err(|e| MasklineError::serde(e.to_string()))?;
    decode(&wire)
}

#[cfg(test)]
#[path = "../../tests/unit/wire/format.rs"]
mod tests;
