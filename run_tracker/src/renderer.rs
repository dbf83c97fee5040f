use run_tracker_lib::route::{MapRegion, RouteSegment};

/// Receives drawing instructions for the route of the current run. Pure sink.
pub trait RouteRenderer: Send + 'static {
    fn add_segment(&mut self, segment: &RouteSegment);

    fn set_region(&mut self, region: &MapRegion);

    /// Remove everything drawn for a previous run.
    fn clear_overlays(&mut self);
}

/// Renderer for headless use, writes every instruction to the log.
#[derive(Debug, Default)]
pub struct TracingRenderer {
    segments_drawn: usize,
}

impl TracingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments_drawn(&self) -> usize {
        self.segments_drawn
    }
}

impl RouteRenderer for TracingRenderer {
    fn add_segment(&mut self, segment: &RouteSegment) {
        self.segments_drawn += 1;
        tracing::trace!(
            "Segment {}: ({:.6}, {:.6}) -> ({:.6}, {:.6}) {}",
            self.segments_drawn,
            segment.start.y, segment.start.x,
            segment.end.y, segment.end.x,
            segment.color.to_hex()
        );
    }

    fn set_region(&mut self, region: &MapRegion) {
        tracing::trace!(
            "Region centered on ({:.6}, {:.6}), {}m x {}m",
            region.center.y, region.center.x,
            region.latitudinal_meters, region.longitudinal_meters
        );
    }

    fn clear_overlays(&mut self) {
        tracing::debug!("Cleared {} segments", self.segments_drawn);
        self.segments_drawn = 0;
    }
}

#[test]
fn counts_segments_until_cleared() {
    use geo_types::Coord;
    use run_tracker_lib::route::SegmentColor;

    let segment = RouteSegment {
        start: Coord { x: 10.0, y: 56.0 },
        end: Coord { x: 10.001, y: 56.0 },
        color: SegmentColor::BLUE,
    };

    let mut renderer = TracingRenderer::new();
    renderer.add_segment(&segment);
    renderer.add_segment(&segment);
    renderer.set_region(&MapRegion::square(segment.end, 500.0));
    assert_eq!(renderer.segments_drawn(), 2);

    renderer.clear_overlays();
    assert_eq!(renderer.segments_drawn(), 0);
}
