use candle_core::{DType, Device, Tensor, Var, D};
use candle_nn::{ops::log_softmax, Linear, Module, VarBuilder, VarMap};
use embedding::{shift_right, Embedder, EmbedderConfig};
use layerdrop::{
    error::configuration, ConditionalBlockExecutor, Computation, LayerDecision, LayerDropError,
    ReplicaGroup, Result, SkipPolicy,
};
use layers::{LayerNorm, NormConfig, RandomState, RunMode};
use log::{debug, info};

use crate::{
    block::BlockSpec,
    config::{ModelConfig, PolicyKind},
    factory::BlockFactory,
};

fn ensure_policy_matches(config: &ModelConfig, policy: &dyn SkipPolicy) -> Result<()> {
    let expected_name = match config.policy {
        PolicyKind::Global => "global",
        PolicyKind::PerLayer => "per_layer",
    };
    if policy.name() != expected_name {
        return Err(configuration(
            "policy",
            format!("config selects {expected_name}, got a {} policy", policy.name()),
        ));
    }
    if policy.mode() != config.mode {
        return Err(configuration(
            "mode",
            format!("config runs in {}, policy in {}", config.mode, policy.mode()),
        ));
    }
    if policy.skip_fraction() != config.skip_fraction {
        return Err(configuration(
            "skip_fraction",
            format!(
                "config has {}, policy has {}",
                config.skip_fraction,
                policy.skip_fraction()
            ),
        ));
    }
    if let Some(depth) = policy.fixed_depth() {
        if depth != config.n_layers {
            return Err(configuration(
                "n_layers",
                format!("config has {} layers, policy expects {depth}", config.n_layers),
            ));
        }
    }
    Ok(())
}

/// Per-layer decisions taken during one forward pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassTrace {
    pub pass_scalar: Option<f32>,
    pub decisions: Vec<LayerDecision>,
}

impl PassTrace {
    /// Indices of the layers whose block ran, in order.
    pub fn executed_layers(&self) -> Vec<usize> {
        self.decisions
            .iter()
            .filter(|decision| decision.execute)
            .map(|decision| decision.layer)
            .collect()
    }

    pub fn skipped_layers(&self) -> Vec<usize> {
        self.decisions
            .iter()
            .filter(|decision| !decision.execute)
            .map(|decision| decision.layer)
            .collect()
    }
}

/// Decoder-only transformer whose blocks are gated by a [`SkipPolicy`].
///
/// Parameters live in one [`VarMap`]; the model itself is read-only during a
/// pass and can be shared across replica threads.
pub struct Model {
    config: ModelConfig,
    device: Device,
    varmap: VarMap,
    embedder: Embedder,
    layers: Vec<ConditionalBlockExecutor<Box<dyn Computation>>>,
    final_norm: LayerNorm,
    head: Linear,
    policy: Box<dyn SkipPolicy>,
}

impl Model {
    /// Builds a model whose blocks come from `factory`. `policy` must agree
    /// with `config` on kind, mode, skip fraction and depth.
    pub(crate) fn assemble(
        config: ModelConfig,
        device: &Device,
        policy: Box<dyn SkipPolicy>,
        factory: &dyn BlockFactory,
    ) -> Result<Self> {
        config.validate()?;
        ensure_policy_matches(&config, policy.as_ref())?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

        let embedder = Embedder::load(
            &EmbedderConfig {
                vocab_size: config.vocab_size,
                hidden_dim: config.d_model,
                max_len: config.max_len,
                dropout: config.dropout,
                mode: config.mode,
            },
            vb.pp("embedder"),
            device,
        )?;

        let blocks_vb = vb.pp("blocks");
        let mut layers = Vec::with_capacity(config.n_layers);
        for layer_index in 0..config.n_layers {
            let spec = BlockSpec {
                d_model: config.d_model,
                d_ff: config.d_ff,
                n_heads: config.n_heads,
                dropout: config.dropout,
                mode: config.mode,
                activation: config.activation,
                layer_index,
            };
            let block = factory.build(&spec, blocks_vb.pp(layer_index))?;
            layers.push(ConditionalBlockExecutor::new(block, layerdrop::Identity)?);
        }

        let final_norm = LayerNorm::load(NormConfig::new(config.d_model), vb.pp("final_norm"))?;
        let head = candle_nn::linear(config.d_model, config.vocab_size, vb.pp("head"))?;

        info!(
            "assembled layerdrop decoder: {} layers, policy={}, skip_fraction={}, mode={}, expected execution rate {:.3}",
            config.n_layers,
            policy.name(),
            policy.skip_fraction(),
            config.mode,
            policy.expected_execution_rate()
        );

        Ok(Self {
            config,
            device: device.clone(),
            varmap,
            embedder,
            layers,
            final_norm,
            head,
            policy,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn mode(&self) -> RunMode {
        self.config.mode
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn policy(&self) -> &dyn SkipPolicy {
        self.policy.as_ref()
    }

    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    /// Parameter container, for checkpointing or an external optimizer.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn trainable_vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }

    /// Trainable variables with their scoped names, sorted by name.
    pub fn named_parameters(&self) -> Result<Vec<(String, Var)>> {
        let data = self.varmap.data().lock().map_err(|_| {
            LayerDropError::Tensor(candle_core::Error::Msg(
                "parameter map lock poisoned".into(),
            ))
        })?;
        let mut named: Vec<(String, Var)> = data
            .iter()
            .map(|(name, var)| (name.clone(), var.clone()))
            .collect();
        named.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(named)
    }

    /// Maps `(batch, seq)` token ids to `(batch, seq, vocab_size)` log-probabilities.
    ///
    /// `rng` advances by exactly one draw. `group` must be joined by every
    /// replica running this pass.
    pub fn forward(
        &self,
        token_ids: &Tensor,
        rng: &mut RandomState,
        group: &dyn ReplicaGroup,
    ) -> Result<Tensor> {
        let (log_probs, _) = self.forward_traced(token_ids, rng, group)?;
        Ok(log_probs)
    }

    /// Like [`Model::forward`], also returning the per-layer decisions.
    pub fn forward_traced(
        &self,
        token_ids: &Tensor,
        rng: &mut RandomState,
        group: &dyn ReplicaGroup,
    ) -> Result<(Tensor, PassTrace)> {
        let pass_key = rng.advance();
        let (mut decision_rng, dropout_key) = pass_key.split();

        let shifted = shift_right(token_ids, self.config.mode)?;
        let mut hidden = self.embedder.forward(&shifted, dropout_key.fold_in(0))?;

        let pass_scalar = self.policy.prepare_pass(&mut decision_rng, group)?;
        let mut trace = PassTrace {
            pass_scalar,
            decisions: Vec::with_capacity(self.layers.len()),
        };
        for (index, layer) in self.layers.iter().enumerate() {
            let decision = self
                .policy
                .decide(index, pass_scalar, &mut decision_rng, group)?;
            let block_key = dropout_key.fold_in(index as u64 + 1);
            hidden = layer.run(decision.execute, &hidden, block_key)?;
            trace.decisions.push(decision);
        }

        let normed = self.final_norm.forward(&hidden)?;
        let logits = self.head.forward(&normed)?;
        let log_probs = log_softmax(&logits, D::Minus1)?;

        debug!(
            "{} pass on rank {}/{}: executed layers {:?} of {}",
            self.config.mode,
            group.rank(),
            group.world_size(),
            trace.executed_layers(),
            self.layers.len()
        );
        Ok((log_probs, trace))
    }
}
