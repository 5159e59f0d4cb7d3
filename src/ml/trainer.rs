// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
// Two backends are in play:
//   - TrainBackend (Autodiff<NdArray>) carries gradients
//   - model.valid() maps onto EvalBackend (NdArray) for the
//     validation phase, with dropout disabled
//
// The learning rate is not a constant: it steps down by a decade
// every 8 epochs, lr(epoch) = 0.001 * 10^(-floor(epoch / 8)),
// applied at the top of each epoch.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use burn::data::dataloader::DataLoaderBuilder;
use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;

use crate::data::batcher::FrameBatcher;
use crate::data::dataset::FrameDataset;
use crate::domain::error::Result;
use crate::infra::results::TrainHistory;
use crate::ml::registry::Network;
use crate::ml::{Classifier, EvalBackend, TrainBackend};

/// Knobs the orchestrator passes down for one fit.
#[derive(Debug, Clone)]
pub struct FitSettings {
    pub n_epochs: usize,
    pub batch_size: usize,
    /// Seed for the training loader's shuffle.
    pub shuffle_seed: u64,
}

/// Initial learning rate and the decade step of the schedule.
const BASE_LR: f64 = 0.001;
const LR_DECADE_EPOCHS: usize = 8;

/// lr(epoch) = 0.001 * 10^(-floor(epoch / 8)), epoch counted from 0.
pub fn scheduled_lr(epoch: usize) -> f64 {
    BASE_LR * 10f64.powi(-((epoch / LR_DECADE_EPOCHS) as i32))
}

/// Train a network and return it with its per-epoch history.
pub fn fit(
    network: Network<TrainBackend>,
    train_dataset: FrameDataset,
    val_dataset: FrameDataset,
    settings: &FitSettings,
    device: &burn::backend::ndarray::NdArrayDevice,
) -> Result<(Network<TrainBackend>, TrainHistory)> {
    match network {
        Network::Cnn(model) => {
            let (model, history) = fit_model(model, train_dataset, val_dataset, settings, device)?;
            Ok((Network::Cnn(model), history))
        }
        Network::Transformer(model) => {
            let (model, history) = fit_model(model, train_dataset, val_dataset, settings, device)?;
            Ok((Network::Transformer(model), history))
        }
    }
}

fn fit_model<M>(
    mut model: M,
    train_dataset: FrameDataset,
    val_dataset: FrameDataset,
    settings: &FitSettings,
    device: &burn::backend::ndarray::NdArrayDevice,
) -> Result<(M, TrainHistory)>
where
    M: AutodiffModule<TrainBackend> + Classifier<TrainBackend>,
    M::InnerModule: Classifier<EvalBackend>,
{
    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_batcher = FrameBatcher::<TrainBackend>::new(device.clone());
    let train_loader = DataLoaderBuilder::new(train_batcher)
        .batch_size(settings.batch_size)
        .shuffle(settings.shuffle_seed)
        .num_workers(1)
        .build(train_dataset);

    // Validation runs on the inner backend, no autodiff overhead
    let val_batcher = FrameBatcher::<EvalBackend>::new(device.clone());
    let val_loader = DataLoaderBuilder::new(val_batcher)
        .batch_size(settings.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let mut history = TrainHistory::default();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..settings.n_epochs {
        let lr = scheduled_lr(epoch);

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches = 0usize;
        let mut correct = 0usize;
        let mut seen = 0usize;

        for batch in train_loader.iter() {
            let logits = model.forward(batch.frames);
            let loss = CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits.clone(), batch.labels.clone());

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches += 1;

            // argmax(1) returns [batch, 1]; flatten before comparing
            let predictions = logits.argmax(1).flatten::<1>(0, 1);
            seen += batch.labels.dims()[0];
            correct += predictions
                .equal(batch.labels)
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>() as usize;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);
        }

        let train_loss = if batches > 0 {
            loss_sum / batches as f64
        } else {
            f64::NAN
        };
        let train_acc = if seen > 0 {
            correct as f64 / seen as f64
        } else {
            f64::NAN
        };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let mut val_loss_sum = 0.0f64;
        let mut val_batches = 0usize;
        let mut val_correct = 0usize;
        let mut val_seen = 0usize;

        for batch in val_loader.iter() {
            let logits = model_valid.forward(batch.frames);
            let loss = CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits.clone(), batch.labels.clone());
            val_loss_sum += loss.into_scalar().elem::<f64>();
            val_batches += 1;

            let predictions = logits.argmax(1).flatten::<1>(0, 1);
            val_seen += batch.labels.dims()[0];
            val_correct += predictions
                .equal(batch.labels)
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>() as usize;
        }

        let val_loss = if val_batches > 0 {
            val_loss_sum / val_batches as f64
        } else {
            f64::NAN
        };
        let val_acc = if val_seen > 0 {
            val_correct as f64 / val_seen as f64
        } else {
            f64::NAN
        };

        history.loss.push(train_loss);
        history.accuracy.push(train_acc);
        history.val_loss.push(val_loss);
        history.val_accuracy.push(val_acc);

        println!(
            "Epoch {:>3}/{} | lr={:.6} | train_loss={:.4} | val_loss={:.4} | train_acc={:.1}% | val_acc={:.1}%",
            epoch + 1,
            settings.n_epochs,
            lr,
            train_loss,
            val_loss,
            train_acc * 100.0,
            val_acc * 100.0,
        );
    }

    tracing::info!("Training complete after {} epochs", settings.n_epochs);
    Ok((model, history))
}
