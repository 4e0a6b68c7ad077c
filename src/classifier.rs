use crate::types::{Axis, PerAxis, TelemetrySample, ZoneKind};
use crate::zones::{ZoneSet, MAX_BOUNDARIES};

/// Fixed-size set of boundary indices (position among the set's boundaries).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundaryMask(u64);

impl BoundaryMask {
    pub fn insert(&mut self, id: usize) {
        debug_assert!(id < MAX_BOUNDARIES);
        self.0 |= 1u64 << id;
    }

    pub fn contains(&self, id: usize) -> bool {
        id < MAX_BOUNDARIES && self.0 & (1u64 << id) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_BOUNDARIES).filter(move |id| self.contains(*id))
    }
}

/// Occupancy of one axis for one sample
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AxisStatus {
    pub advice: bool,
    pub caution: bool,
    pub boundary: bool,
    /// Kind of the last matching advice/caution zone in definition order
    pub zone_type: Option<ZoneKind>,
}

impl AxisStatus {
    pub fn is_active(&self, kind: ZoneKind) -> bool {
        match kind {
            ZoneKind::Advice => self.advice,
            ZoneKind::Caution => self.caution,
            ZoneKind::Boundary => self.boundary,
        }
    }

    pub fn is_idle(&self) -> bool {
        !(self.advice || self.caution || self.boundary)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub thrust: AxisStatus,
    pub angle: AxisStatus,
    pub boundaries: BoundaryMask,
}

impl Classification {
    pub fn axis(&self, axis: Axis) -> &AxisStatus {
        match axis {
            Axis::Thrust => &self.thrust,
            Axis::Angle => &self.angle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.thrust.is_idle() && self.angle.is_idle()
    }
}

/// Classify a sample against a zone set.
///
/// Pure and allocation free; O(number of zones). Overlapping zones of the
/// same kind resolve `zone_type` to the last match in definition order.
pub fn classify(sample: &TelemetrySample, zones: &ZoneSet) -> Classification {
    let values = PerAxis::new(sample.thrust, sample.angle);
    let mut status = PerAxis::<AxisStatus>::default();
    let mut boundaries = BoundaryMask::default();
    let mut boundary_id = 0usize;

    for zone in &zones.zones {
        let inside = zone.contains(*values.get(zone.axis));
        let axis_status = status.get_mut(zone.axis);

        match zone.kind {
            ZoneKind::Boundary => {
                // Validation caps a set at MAX_BOUNDARIES; ids past the mask
                // width are ignored
                if inside && boundary_id < MAX_BOUNDARIES {
                    boundaries.insert(boundary_id);
                    axis_status.boundary = true;
                }
                // Ids count boundaries only, matching set_boundary order
                boundary_id += 1;
            }
            // Later zones overwrite zone_type: last match wins
            ZoneKind::Advice if inside => {
                axis_status.advice = true;
                axis_status.zone_type = Some(ZoneKind::Advice);
            }
            ZoneKind::Caution if inside => {
                axis_status.caution = true;
                axis_status.zone_type = Some(ZoneKind::Caution);
            }
            _ => {}
        }
    }

    Classification {
        thrust: status.thrust,
        angle: status.angle,
        boundaries,
    }
}
