use sheetness_imgproc::{
    functor::SheetPolarity, threshold::binary_threshold, ExecutionStrategy, NoiseNormalization,
    SheetnessConfig, SheetnessError, SheetnessFeatureGenerator, SheetnessMethod,
};
use sheetness_volume::{Volume, VolumeGeometry, VolumeSize};

const PLANE_Z: usize = 8;

fn plane(inside: i16, outside: i16) -> Volume<i16> {
    Volume::from_fn(VolumeSize::new(16, 16, 16), |[_, _, z]| {
        if z == PLANE_Z {
            inside
        } else {
            outside
        }
    })
}

fn modified_config() -> SheetnessConfig {
    SheetnessConfig::default()
        .with_unsharp(None)
        .with_sigmas(vec![0.75, 1.0])
        .with_method(SheetnessMethod::Modified {
            alpha: 0.5,
            noise: NoiseNormalization::Automatic {
                scale: 0.05,
                label: 1,
            },
        })
}

#[test]
fn test_bright_plane_is_detected() -> Result<(), SheetnessError> {
    let input = plane(1000, 0);
    let generator = SheetnessFeatureGenerator::new(modified_config())?;

    let out = generator.generate(&input, None)?;
    assert_eq!(out.size(), input.size());

    // interior of the plane, away from the lateral borders
    for y in 4..12 {
        for x in 4..12 {
            let v = *out.get([x, y, PLANE_Z]).unwrap();
            assert!(v > 0.9, "voxel ({x}, {y}, {PLANE_Z}) = {v}");
        }
    }

    // beyond the support of every kernel
    for z in 0..2 {
        assert!(out.slice(z).iter().all(|&v| v == 0.0));
    }

    Ok(())
}

#[test]
fn test_dark_plane_needs_dark_polarity() -> Result<(), SheetnessError> {
    let input = plane(0, 1000);

    let dark = SheetnessFeatureGenerator::new(modified_config().with_polarity(SheetPolarity::Dark))?
        .generate(&input, None)?;
    let bright = SheetnessFeatureGenerator::new(modified_config())?.generate(&input, None)?;

    let center = [8, 8, PLANE_Z];
    assert!(*dark.get(center).unwrap() > 0.9);
    assert!(*bright.get(center).unwrap() < -0.9);

    Ok(())
}

#[test]
fn test_intensity_scaling_and_mask() -> Result<(), SheetnessError> {
    let input = plane(1000, 0);
    let mask = input.map(|&v| u8::from(v > 0));

    let unmasked = SheetnessFeatureGenerator::new(modified_config())?.generate(&input, None)?;
    let scaled = SheetnessFeatureGenerator::new(
        modified_config()
            .with_intensity_scaling(100.0)
            .with_strategy(ExecutionStrategy::Fixed(2)),
    )?
    .generate(&input, Some(&mask))?;

    // the plane holds the largest norm, so the masked estimate matches the global one
    for (a, b) in unmasked.as_slice().iter().zip(scaled.as_slice()) {
        assert!((a * 100.0 - b).abs() < 1e-3, "{a} vs {b}");
    }

    let mut binary = scaled.graft(0u8);
    binary_threshold(
        &scaled,
        &mut binary,
        50.0,
        f32::MAX,
        1,
        0,
        ExecutionStrategy::Serial,
    )?;
    assert_eq!(*binary.get([8, 8, PLANE_Z]).unwrap(), 1);
    assert_eq!(*binary.get([8, 8, 0]).unwrap(), 0);

    Ok(())
}

#[test]
fn test_default_pipeline_on_anisotropic_volume() -> Result<(), SheetnessError> {
    let input = plane(1000, 0).with_geometry(VolumeGeometry::with_spacing([0.8, 0.8, 1.5]))?;
    let generator = SheetnessFeatureGenerator::new(SheetnessConfig::default())?;

    let out = generator.generate(&input, None)?;

    assert_eq!(out.geometry(), input.geometry());
    assert!(out.as_slice().iter().all(|v| v.is_finite()));
    Ok(())
}

fn assert_plane_interior(out: &Volume<f32>, min: f32) {
    for y in 4..12 {
        for x in 4..12 {
            let v = *out.get([x, y, PLANE_Z]).unwrap();
            assert!(v > min, "voxel ({x}, {y}, {PLANE_Z}) = {v}");
        }
    }
}

fn assert_slices_zero(out: &Volume<f32>, slices: &[usize]) {
    for &z in slices {
        assert!(
            out.slice(z).iter().all(|&v| v == 0.0),
            "slice {z} is not zero: {:?}",
            out.slice(z).iter().find(|&&v| v != 0.0)
        );
    }
}

#[test]
fn test_gated_methods_on_bright_plane() -> Result<(), SheetnessError> {
    let input = plane(1000, 0);

    for method in [
        SheetnessMethod::default(),
        SheetnessMethod::Femur {
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.25,
        },
    ] {
        let out = SheetnessFeatureGenerator::new(SheetnessConfig::default().with_method(method))?
            .generate(&input, None)?;

        assert_plane_interior(&out, 0.9);

        // the slices next to the plane curve the other way and are gated out
        assert_slices_zero(&out, &[6, 7, 9, 10]);
        assert!(out.as_slice().iter().all(|&v| v >= 0.0), "{method:?}");

        // beyond the support of the enhanced plane
        assert_slices_zero(&out, &[0, 1, 15]);
    }

    Ok(())
}

#[test]
fn test_gated_methods_with_dark_polarity() -> Result<(), SheetnessError> {
    let input = plane(1000, 0);

    let out = SheetnessFeatureGenerator::new(
        SheetnessConfig::default().with_polarity(SheetPolarity::Dark),
    )?
    .generate(&input, None)?;

    // a bright plane is invisible to dark detection
    assert_slices_zero(&out, &[PLANE_Z]);
    assert!(out.as_slice().iter().all(|&v| v <= 0.0));

    Ok(())
}

#[test]
fn test_descoteaux_on_bright_plane() -> Result<(), SheetnessError> {
    let input = plane(1000, 0);
    let out = SheetnessFeatureGenerator::new(SheetnessConfig::default().with_method(
        SheetnessMethod::Descoteaux {
            alpha: 0.5,
            beta: 0.5,
            noise: NoiseNormalization::Automatic {
                scale: 0.05,
                label: 1,
            },
        },
    ))?
    .generate(&input, None)?;

    assert_plane_interior(&out, 0.9);

    // no gating: the neighbouring slices keep a response of the opposite sign
    let flank = *out.get([8, 8, PLANE_Z - 1]).unwrap();
    assert!(flank < -0.5, "flank = {flank}");

    assert_slices_zero(&out, &[0, 1, 15]);
    Ok(())
}

#[test]
fn test_generator_errors() -> Result<(), SheetnessError> {
    assert!(matches!(
        SheetnessFeatureGenerator::new(SheetnessConfig::default().with_sigmas(vec![0.0])),
        Err(SheetnessError::InvalidSigma(_))
    ));

    let input = plane(1000, 0);
    let small_mask = Volume::from_size_val(VolumeSize::new(4, 4, 4), 1u8)?;
    let generator = SheetnessFeatureGenerator::new(modified_config())?;
    assert!(generator.generate(&input, Some(&small_mask)).is_err());

    Ok(())
}
