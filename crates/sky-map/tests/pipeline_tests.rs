//! End-to-end tests: raw fields and sources through binning, stacking and gap filling.

use std::cell::Cell;
use std::fmt;

use chrono::{TimeZone, Utc};
use sky_map::{
    bin, resolution_for_angular_size, CellIndexer, Coordinates, FieldRequest, FieldSource,
    LonLatWindow, Nside, SkyMap, SkyMapConfig, SkyMapError, SourceField, Stat,
};
use test_utils::{
    assert_approx_eq, create_index_grid, create_sst_grid, create_sst_grid_kelvin, create_swath,
    fixtures, sst_celsius, with_coord_fill, with_nans,
};

fn window(bounds: (f64, f64, f64, f64)) -> LonLatWindow {
    LonLatWindow::new(bounds.0, bounds.1, bounds.2, bounds.3).unwrap()
}

fn global_2deg() -> (Vec<f64>, Vec<f64>) {
    let grid = fixtures::grids::GLOBAL_2DEG;
    (grid.lat(), grid.lon())
}

#[test]
fn test_two_degree_grid_with_one_missing_sample() {
    let (lat, lon) = global_2deg();
    let (nside, actual) = resolution_for_angular_size(2.0).unwrap();
    assert!(actual <= 2.0);
    assert_eq!(nside.get(), 32);

    let coords = Coordinates::OneDimensional {
        lat: lat.clone(),
        lon: lon.clone(),
    };
    let clean = SkyMap::from_raw(&coords, &create_sst_grid(&lat, &lon), Some(nside), Stat::Mean)
        .unwrap();

    // An equatorial sample that is alone in its cell.
    let indexer = CellIndexer::new(nside);
    let row = lat.iter().position(|&l| l == 1.0).unwrap();
    let col = (0..lon.len())
        .find(|&c| {
            let cell = indexer.cell_of(lat[row], lon[c]).unwrap();
            clean.counts()[cell as usize] == 1
        })
        .unwrap();
    let lonely = indexer.cell_of(lat[row], lon[col]).unwrap();

    let values = with_nans(create_sst_grid(&lat, &lon), lon.len(), &[(row, col)]);
    let holed = SkyMap::from_raw(&coords, &values, Some(nside), Stat::Mean).unwrap();

    let newly_masked: Vec<u64> = (0..holed.npix())
        .filter(|&i| holed.mask()[i as usize] && !clean.mask()[i as usize])
        .collect();
    assert_eq!(newly_masked, vec![lonely]);
    assert_eq!(holed.n_valid(), clean.n_valid() - 1);
    for i in 0..holed.npix() as usize {
        if !holed.mask()[i] {
            assert!(holed.counts()[i] >= 1);
        }
    }
}

#[test]
fn test_coverage_invariant() {
    let (lat, lon) = global_2deg();
    let (lats, lons) = Coordinates::OneDimensional {
        lat: lat.clone(),
        lon: lon.clone(),
    }
    .expand();
    let values = create_sst_grid(&lat, &lon);

    for n in [1u32, 4, 16, 64] {
        let nside = Nside::new(n).unwrap();
        for stat in [Stat::Mean, Stat::Median] {
            let cells = bin(nside, &lats, &lons, &values, stat).unwrap();
            let npix = nside.npix() as usize;
            assert_eq!(cells.values.len(), npix);
            assert_eq!(cells.counts.len(), npix);
            assert_eq!(cells.mask.len(), npix);
            for i in 0..npix {
                assert_eq!(cells.mask[i], cells.counts[i] == 0);
            }
        }
    }
}

#[test]
fn test_one_sample_per_cell_is_reproduced() {
    let nside = Nside::new(4).unwrap();
    let indexer = CellIndexer::new(nside);
    let (lons, lats) = indexer.centers();
    let values: Vec<f64> = (0..lons.len()).map(|i| i as f64 * 0.5 - 3.0).collect();

    let cells = bin(nside, &lats, &lons, &values, Stat::Median).unwrap();
    for i in 0..values.len() {
        assert_eq!(cells.values[i], values[i]);
        assert_eq!(cells.counts[i], 1);
        assert!(!cells.mask[i]);
    }
}

#[test]
fn test_samples_land_in_their_own_cells() {
    // 1 degree spacing at nside 512 puts every sample in a different cell
    let lat: Vec<f64> = (0..4).map(|r| -20.5 + r as f64).collect();
    let lon: Vec<f64> = (0..6).map(|c| 300.5 + c as f64).collect();
    let values = create_index_grid(lat.len(), lon.len());
    let nside = Nside::new(512).unwrap();
    let coords = Coordinates::OneDimensional {
        lat: lat.clone(),
        lon: lon.clone(),
    };
    let map = SkyMap::from_raw(&coords, &values, Some(nside), Stat::Mean).unwrap();

    assert_eq!(map.n_valid(), lat.len() * lon.len());
    let indexer = CellIndexer::new(nside);
    for (row, &la) in lat.iter().enumerate() {
        for (col, &lo) in lon.iter().enumerate() {
            let cell = indexer.cell_of(la, lo).unwrap();
            assert_eq!(map.value(cell), Some((row * 1000 + col) as f64));
        }
    }
}

#[test]
fn test_derived_nside_from_coordinate_spacing() {
    let grid = fixtures::grids::PHILIPPINE_SEA_0P125;
    let (lat, lon) = (grid.lat(), grid.lon());
    let coords = Coordinates::OneDimensional {
        lat: lat.clone(),
        lon: lon.clone(),
    };
    let map = SkyMap::from_raw(&coords, &create_sst_grid(&lat, &lon), None, Stat::Mean).unwrap();
    assert!(map.pix_resol_deg() <= 0.125);
    assert_eq!(map.nside().get(), 512);
    assert!(map.n_valid() > 0);
}

#[test]
fn test_curvilinear_without_nside_is_rejected() {
    let (lat, lon) = create_swath(3, 3, 0.0, 10.0, 0.1);
    let coords = Coordinates::Curvilinear {
        lat,
        lon,
        shape: (3, 3),
    };
    let err = SkyMap::from_raw(&coords, &[1.0; 9], None, Stat::Mean).unwrap_err();
    assert!(matches!(err, SkyMapError::MissingPrerequisite(_)));
}

#[test]
fn test_value_shape_mismatch() {
    let coords = Coordinates::OneDimensional {
        lat: vec![0.0, 1.0],
        lon: vec![0.0, 1.0, 2.0],
    };
    let err = SkyMap::from_raw(&coords, &[1.0; 5], Some(Nside::new(4).unwrap()), Stat::Mean)
        .unwrap_err();
    assert!(matches!(err, SkyMapError::ShapeMismatch(_)));
}

#[test]
fn test_stack_any_available() {
    let nside = Nside::new(8).unwrap();
    let east = SkyMap::from_raw(
        &Coordinates::OneDimensional {
            lat: vec![0.0],
            lon: vec![45.0],
        },
        &[10.0],
        Some(nside),
        Stat::Mean,
    )
    .unwrap();
    let both = SkyMap::from_raw(
        &Coordinates::OneDimensional {
            lat: vec![0.0],
            lon: vec![45.0, 225.0],
        },
        &[20.0, 3.0],
        Some(nside),
        Stat::Mean,
    )
    .unwrap();

    let stacked = SkyMap::from_list(&[east.clone(), both]).unwrap();
    let indexer = CellIndexer::new(nside);
    assert_eq!(stacked.value(indexer.cell_of(0.0, 45.0).unwrap()), Some(15.0));
    assert_eq!(stacked.value(indexer.cell_of(0.0, 225.0).unwrap()), Some(3.0));
    assert_eq!(stacked.n_valid(), 2);
    assert_eq!(stacked.lons(), east.lons());

    let coarse = SkyMap::from_raw(
        &Coordinates::OneDimensional {
            lat: vec![0.0],
            lon: vec![45.0],
        },
        &[1.0],
        Some(Nside::new(4).unwrap()),
        Stat::Mean,
    )
    .unwrap();
    assert!(matches!(
        SkyMap::from_list(&[east, coarse]),
        Err(SkyMapError::ResolutionMismatch {
            expected: 8,
            found: 4
        })
    ));
}

fn mostly_empty(nside: Nside) -> SkyMap {
    let npix = nside.npix() as usize;
    let indexer = CellIndexer::new(nside);
    let mut values = vec![0.0; npix];
    let mut mask = vec![true; npix];
    let mut counts = vec![0; npix];
    // keep every third cell valid
    for i in (0..npix).step_by(3) {
        let (lon, lat) = indexer.center_of(i as u64).unwrap();
        values[i] = sst_celsius(lat, lon);
        mask[i] = false;
        counts[i] = 1;
    }
    SkyMap::from_parts(nside, values, mask, counts, None).unwrap()
}

fn smooth_reference(nside: Nside) -> SkyMap {
    let indexer = CellIndexer::new(nside);
    let (lons, lats) = indexer.centers();
    let values: Vec<f64> = lats
        .iter()
        .zip(&lons)
        .map(|(&la, &lo)| sst_celsius(la, lo))
        .collect();
    let npix = values.len();
    SkyMap::from_parts(nside, values, vec![false; npix], vec![1; npix], None).unwrap()
}

#[test]
fn test_gap_filling_never_touches_cells_outside_window() {
    let reference = smooth_reference(Nside::new(32).unwrap());
    for bounds in [
        fixtures::windows::PHILIPPINE_SEA,
        fixtures::windows::GUINEA_WRAP,
        fixtures::windows::SOUTH_PACIFIC,
    ] {
        let w = window(bounds);
        let before = mostly_empty(Nside::new(16).unwrap());
        let mut after = before.clone();
        after.fill_gaps(&reference, &w).unwrap();

        for i in 0..before.npix() as usize {
            if !w.contains(before.lons()[i], before.lats()[i]) {
                assert_eq!(before.mask()[i], after.mask()[i]);
                assert_eq!(before.values()[i], after.values()[i]);
            }
        }
    }
}

#[test]
fn test_gap_filling_across_the_seam() {
    let nside = Nside::new(16).unwrap();
    let reference = smooth_reference(Nside::new(32).unwrap());
    let mut target = mostly_empty(nside);
    let before = target.clone();
    let w = window(fixtures::windows::GUINEA_WRAP);
    assert!(w.wraps_date_line());

    let filled = target.fill_gaps(&reference, &w).unwrap();
    assert!(filled > 0);

    let changed: Vec<usize> = (0..target.npix() as usize)
        .filter(|&i| before.mask()[i] && !target.mask()[i])
        .collect();
    assert_eq!(changed.len(), filled);
    assert!(changed.iter().any(|&i| target.lons()[i] >= 350.0));
    assert!(changed.iter().any(|&i| target.lons()[i] <= 10.0));
    for &i in &changed {
        let expected = sst_celsius(target.lats()[i], target.lons()[i]);
        assert_approx_eq!(target.values()[i], expected, 0.5);
    }

    // a second pass has nothing left to fill
    assert_eq!(target.fill_gaps(&reference, &w).unwrap(), 0);
}

#[derive(Debug)]
struct MockError(String);

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MockError {}

/// Serves one prepared field and counts how often it is asked.
struct MockSource {
    field: Option<SourceField>,
    loads: Cell<usize>,
}

impl MockSource {
    fn serving(field: SourceField) -> Self {
        Self {
            field: Some(field),
            loads: Cell::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            field: None,
            loads: Cell::new(0),
        }
    }
}

impl FieldSource for MockSource {
    type Error = MockError;

    fn load(&self, request: &FieldRequest) -> Result<SourceField, MockError> {
        self.loads.set(self.loads.get() + 1);
        self.field
            .clone()
            .ok_or_else(|| MockError(format!("no variable '{}'", request.variable)))
    }
}

#[test]
fn test_from_source_applies_qc_and_units() {
    let lat = vec![1.0];
    let lon = vec![1.0, 45.0, 91.0];
    let kelvin = create_sst_grid_kelvin(&lat, &lon);
    let time = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
    let source = MockSource::serving(
        SourceField::new(
            Coordinates::OneDimensional {
                lat: lat.clone(),
                lon: lon.clone(),
            },
            kelvin,
        )
        .with_quality_mask(vec![false, true, false])
        .with_units("kelvin")
        .with_time(time),
    );

    let nside = Nside::new(8).unwrap();
    let request = FieldRequest::new("/data/ahi/20230601.nc", "sea_surface_temperature")
        .with_nside(nside)
        .to_celsius(true);
    let map = SkyMap::from_source(&source, &request, &SkyMapConfig::default()).unwrap();

    assert_eq!(source.loads.get(), 1);
    assert_eq!(map.n_valid(), 2);
    let indexer = CellIndexer::new(nside);
    let v = map.value(indexer.cell_of(1.0, 1.0).unwrap()).unwrap();
    assert_approx_eq!(v, sst_celsius(1.0, 1.0), 1e-9);
    assert_eq!(map.value(indexer.cell_of(1.0, 45.0).unwrap()), None);

    let provenance = map.provenance().unwrap();
    assert_eq!(provenance.variable.as_deref(), Some("sea_surface_temperature"));
    assert_eq!(provenance.label(), "20230601.nc");
    assert_eq!(provenance.time, Some(time));
}

#[test]
fn test_from_source_leaves_non_kelvin_values() {
    let source = MockSource::serving(
        SourceField::new(
            Coordinates::OneDimensional {
                lat: vec![0.0],
                lon: vec![0.0],
            },
            vec![0.12],
        )
        .with_units("m"),
    );
    let request = FieldRequest::new("ssh.nc", "sla")
        .with_nside(Nside::new(2).unwrap())
        .to_celsius(true);
    let map = SkyMap::from_source(&source, &request, &SkyMapConfig::default()).unwrap();
    assert_eq!(map.n_valid(), 1);
    assert!(map.values().iter().any(|&v| v == 0.12));
}

#[test]
fn test_swath_needs_resolution_hint() {
    let (lat, lon) = create_swath(10, 10, 20.0, 130.0, 0.02);
    let field = SourceField::new(
        Coordinates::Curvilinear {
            lat,
            lon,
            shape: (10, 10),
        },
        vec![0.3; 100],
    );
    let source = MockSource::serving(field);
    let config = SkyMapConfig::default();

    let err = SkyMap::from_source(&source, &FieldRequest::new("swot.nc", "ssha"), &config)
        .unwrap_err();
    assert!(matches!(err, SkyMapError::MissingPrerequisite(_)));

    let request = FieldRequest::new("swot.nc", "ssha").with_resolution_hint_km(2.0);
    let map = SkyMap::from_source(&source, &request, &config).unwrap();
    assert!(map.pix_resol_deg() <= 2.0 / sky_map::KM_PER_DEGREE);
    assert!(map.n_valid() > 0);
}

#[test]
fn test_swath_coordinate_fill_values_are_dropped() {
    let (lat, lon) = create_swath(4, 4, -10.0, 200.0, 0.5);
    let lat = with_coord_fill(lat, &[0, 5]);
    let original_lat = lat.clone();
    let source = MockSource::serving(SourceField::new(
        Coordinates::Curvilinear {
            lat,
            lon,
            shape: (4, 4),
        },
        vec![1.0; 16],
    ));

    let request = FieldRequest::new("swath.nc", "sst")
        .with_nside(Nside::new(64).unwrap())
        .with_stat(Stat::Median);
    let map = SkyMap::from_source(&source, &request, &SkyMapConfig::default()).unwrap();
    assert_eq!(map.counts().iter().sum::<u32>(), 14);

    // the source's own arrays are untouched
    match &source.field.as_ref().unwrap().coordinates {
        Coordinates::Curvilinear { lat, .. } => assert_eq!(lat[0], original_lat[0]),
        _ => unreachable!(),
    }
}

#[test]
fn test_source_failure_is_reported_with_path() {
    let source = MockSource::failing();
    let request = FieldRequest::new("/missing/file.nc", "analysed_sst");
    let err = SkyMap::from_source(&source, &request, &SkyMapConfig::default()).unwrap_err();
    match err {
        SkyMapError::Source { path, message } => {
            assert_eq!(path, "/missing/file.nc");
            assert!(message.contains("analysed_sst"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
