//! GPX export of assembled community shapes, for inspection in a map viewer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use reconcile_core::RouteOutcome;
use reconcile_model::{Coordinate, Shape};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write GPX: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
}

/// `<line_ref>_community_<index>.gpx`, with path separators in the line ref
/// replaced.
pub fn community_track_file_name(line_ref: &str, direction: usize) -> String {
    let safe: String = line_ref
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}_community_{}.gpx", safe, direction)
}

fn waypoint(coordinate: Coordinate) -> Waypoint {
    // GPX points are (x, y) = (lon, lat).
    Waypoint::new(Point::new(coordinate.lon, coordinate.lat))
}

/// Writes `shape` as a single-track GPX 1.1 document, with one waypoint per
/// stop.
pub fn write_gpx<W: Write>(
    writer: W,
    name: &str,
    shape: &Shape,
    stops: &[Coordinate],
) -> Result<(), ReportError> {
    let mut segment = TrackSegment::default();
    segment.points = shape.points.iter().copied().map(waypoint).collect();

    let mut track = Track::default();
    track.name = Some(name.to_string());
    if shape.has_gaps {
        track.description = Some("assembled with gaps".to_string());
    }
    track.segments.push(segment);

    let mut gpx = Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.creator = Some(format!("route-reconcile {}", env!("CARGO_PKG_VERSION")));
    gpx.tracks.push(track);
    gpx.waypoints = stops
        .iter()
        .enumerate()
        .map(|(index, stop)| {
            let mut point = waypoint(*stop);
            point.name = Some(format!("stop {}", index + 1));
            point
        })
        .collect();

    gpx::write(&gpx, writer)?;
    Ok(())
}

/// Writes one file per assembled, non-empty community direction of `outcome`
/// into `dir` and returns the written paths.
pub fn write_route_tracks(dir: &Path, outcome: &RouteOutcome) -> Result<Vec<PathBuf>, ReportError> {
    let mut written = Vec::new();
    for direction in &outcome.directions {
        let Some(shape) = direction.shape.as_ref().filter(|shape| !shape.is_empty()) else {
            continue;
        };
        let path = dir.join(community_track_file_name(&outcome.line_ref, direction.index));
        let file = File::create(&path).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        let name = format!("{} {}", outcome.line_ref, direction.id);
        write_gpx(BufWriter::new(file), &name, shape, &direction.stops)?;
        written.push(path);
    }
    Ok(written)
}
