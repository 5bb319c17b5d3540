use detector_checkpoint::Checkpoint;
use mobile_export::{ExportError, ExportFormat, Exporter, MobileExporter, Q8Archive, QTensor};
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use tempfile::tempdir;

fn random_tensor(shape: &[usize]) -> ArrayD<f32> {
    let mut rng = rand::thread_rng();
    ArrayD::from_shape_fn(IxDyn(shape), |_| rng.gen_range(-2.0..2.0))
}

fn sample_checkpoint() -> Checkpoint {
    Checkpoint::from_tensors(
        "glasses_weights.pt",
        vec![
            ("model.0.conv.weight".to_string(), random_tensor(&[8, 3, 3, 3])),
            ("model.22.dfl.conv.weight".to_string(), random_tensor(&[1, 16, 1, 1])),
            ("model.0.bn.bias".to_string(), ArrayD::zeros(IxDyn(&[8]))),
        ],
    )
}

#[test]
fn quantize_stays_within_one_step() {
    let t = random_tensor(&[4, 5]);
    let q = QTensor::from_array("w", &t).unwrap();
    let max = t.iter().fold(0.0_f32, |m, &v| m.max(v.abs()));
    assert!((q.scale() - max / 127.0).abs() < 1e-6);
    let back = q.dequantize().unwrap();
    for (a, b) in t.iter().zip(back.iter()) {
        assert!((a - b).abs() <= q.scale());
    }
}

#[test]
fn zero_tensor_uses_unit_scale() {
    let q = QTensor::from_array("zeros", &ArrayD::zeros(IxDyn(&[3, 2]))).unwrap();
    assert_eq!(q.scale(), 1.0);
    assert!(q.weight().iter().all(|&w| w == 0));
}

#[test]
fn non_finite_weights_are_rejected() {
    for bad in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
        let t = ArrayD::from_shape_vec(IxDyn(&[3]), vec![0.5, bad, -0.5]).unwrap();
        let err = QTensor::from_array("model.9.cv2.weight", &t).unwrap_err();
        assert!(matches!(err, ExportError::NonFinite { ref name } if name == "model.9.cv2.weight"));
    }
}

#[test]
fn subnormal_weights_survive_quantization() {
    let tiny = f32::MIN_POSITIVE / 4.0;
    let t = ArrayD::from_shape_vec(IxDyn(&[2]), vec![tiny, -tiny / 2.0]).unwrap();
    let q = QTensor::from_array("tiny", &t).unwrap();
    assert!(q.scale() > 0.0 && q.scale().is_finite());
    let back = q.dequantize().unwrap();
    let values: Vec<f32> = back.iter().copied().collect();
    assert!(values[0] > 0.0);
    assert!(values[1] < 0.0);
    for (a, b) in t.iter().zip(back.iter()) {
        assert!((a - b).abs() <= q.scale());
    }
}

#[test]
fn export_fails_on_non_finite_checkpoint() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.q8");
    let ckpt = Checkpoint::from_tensors(
        "broken.pt",
        vec![("w".to_string(), ArrayD::from_elem(IxDyn(&[2]), f32::NAN))],
    );
    let err = MobileExporter.export(&ckpt, ExportFormat::Q8, &dest).unwrap_err();
    assert!(matches!(err, ExportError::NonFinite { .. }));
    assert!(!dest.exists());
}

#[test]
fn exported_archive_reads_back() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.q8");
    let ckpt = sample_checkpoint();
    let written = MobileExporter.export(&ckpt, ExportFormat::Q8, &dest).unwrap();
    assert_eq!(written, dest);

    let archive = Q8Archive::open(&dest).unwrap();
    assert_eq!(archive.tensors().len(), ckpt.len());
    for (name, original) in ckpt.iter() {
        let q = archive.get(name).unwrap();
        assert_eq!(q.shape(), original.shape());
        let back = q.dequantize().unwrap();
        for (a, b) in original.iter().zip(back.iter()) {
            assert!((a - b).abs() <= q.scale());
        }
    }
}

#[test]
fn truncated_archive_is_malformed() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.q8");
    MobileExporter.export(&sample_checkpoint(), ExportFormat::Q8, &dest).unwrap();
    let bytes = std::fs::read(&dest).unwrap();

    let err = Q8Archive::parse(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(matches!(err, ExportError::Malformed(_)));

    let mut extra = bytes.clone();
    extra.push(0);
    assert!(matches!(Q8Archive::parse(&extra), Err(ExportError::Malformed(_))));
}

#[test]
fn foreign_files_are_rejected() {
    assert!(matches!(Q8Archive::parse(b"PK\x03\x04rest"), Err(ExportError::Malformed(_))));
    assert!(matches!(Q8Archive::parse(b"MQ8\0\x02\0\0\0\0\0\0\0"), Err(ExportError::Malformed(_))));

    let dir = tempdir().unwrap();
    let empty = dir.path().join("empty.q8");
    std::fs::write(&empty, b"").unwrap();
    assert!(matches!(Q8Archive::open(&empty), Err(ExportError::Malformed(_))));
}

#[test]
fn empty_archive_has_no_tensors() {
    let mut bytes = b"MQ8\0".to_vec();
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    let archive = Q8Archive::parse(&bytes).unwrap();
    assert!(archive.tensors().is_empty());
}
