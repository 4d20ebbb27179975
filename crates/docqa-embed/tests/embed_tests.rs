use docqa_core::config::EmbeddingSettings;
use docqa_core::traits::Embedder;
use docqa_embed::{get_default_embedder, HashEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { use_fake: true, fake_dim: 64, ..EmbeddingSettings::default() };

    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_many(&texts).expect("embed_many");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(embedder.dim(), 64);
    assert_eq!(v1.len(), 64, "embedding dim follows settings");

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn single_and_batch_agree() {
    let embedder = HashEmbedder::new(32);
    let one = embedder.embed_one("solar panel wiring").unwrap();
    let many = embedder.embed_many(&["solar panel wiring".to_string()]).unwrap();
    assert_eq!(one, many[0]);
}

#[test]
fn empty_text_is_a_zero_vector() {
    let v = HashEmbedder::new(16).embed_one("").unwrap();
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn token_window_pads_and_truncates() {
    use docqa_embed::encode::{EncodeError, TokenWindow, PAD_ID};

    let short = TokenWindow::fit(vec![0, 42, 2], vec![1, 1, 1], 6).unwrap();
    assert_eq!(short.ids(), &[0, 42, 2, PAD_ID, PAD_ID, PAD_ID]);
    assert_eq!(short.attended(), 3);

    let long = TokenWindow::fit((0..10).collect(), vec![1; 10], 4).unwrap();
    assert_eq!(long.ids(), &[0, 1, 2, 3]);
    assert_eq!(long.width(), 4);
    assert_eq!(long.attended(), 4);

    assert!(matches!(TokenWindow::fit(vec![0], vec![1], 0), Err(EncodeError::ZeroWidth)));
}

#[test]
fn token_window_tensors_have_batch_of_one() {
    use candle_core::Device;
    use docqa_embed::encode::TokenWindow;

    let window = TokenWindow::fit(vec![0, 5, 2], vec![1, 1, 1], 8).unwrap();
    let (ids, mask) = window.to_tensors(&Device::Cpu).unwrap();
    assert_eq!(ids.dims(), &[1, 8]);
    assert_eq!(mask.dims(), &[1, 8]);
    let mask: Vec<u32> = mask.squeeze(0).unwrap().to_vec1().unwrap();
    assert_eq!(mask, vec![1, 1, 1, 0, 0, 0, 0, 0]);
}
