use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use vdom_diff::{
    diff_keyed, diff_positional, DiffResult, IndexedPatch, IndexedPatches, Patch, PatchKind,
    PatchSet, PropDelta,
};
use vdom_fiber::{
    Completion, ManualClock, ManualFrameHost, Priority, Scheduler, SchedulerConfig, WorkStatus,
};
use vdom_sdk::{RenderSummary, Renderer, Strategy};
use vdom_types::{Element, NodeId, VTree};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Tree(args) => cmd_tree(args, format),
        Command::Diff(args) => cmd_diff(args, format),
        Command::Apply(args) => cmd_apply(args, format),
        Command::Schedule(args) => cmd_schedule(args, format),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn load_element(path: &Path) -> anyhow::Result<Element> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("cannot parse {}", path.display()))
}

fn load_tree(path: &Path) -> anyhow::Result<VTree> {
    let element = load_element(path)?;
    VTree::build(element).with_context(|| format!("invalid tree in {}", path.display()))
}

fn load_config(path: &Path) -> anyhow::Result<SchedulerConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let config: SchedulerConfig =
        toml::from_str(&raw).with_context(|| format!("cannot parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn strategy(arg: StrategyArg) -> Strategy {
    match arg {
        StrategyArg::Keyed => Strategy::Keyed,
        StrategyArg::Positional => Strategy::Positional,
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `li#b`, `"text"` or `div` for a node.
fn describe(tree: &VTree, id: NodeId) -> String {
    let node = &tree[id];
    if let Some(text) = node.text() {
        return format!("{text:?}");
    }
    match &node.key {
        Some(key) => format!("{}#{}", node.kind.name(), key.as_str()),
        None => node.kind.name().to_string(),
    }
}

fn describe_delta(delta: &PropDelta) -> String {
    delta
        .iter()
        .map(|(name, value)| match value {
            Some(value) => format!("{name}={value}"),
            None => format!("-{name}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn kind_label(kind: PatchKind) -> colored::ColoredString {
    let label = format!("{:<8}", kind.as_str());
    match kind {
        PatchKind::Insert => label.green(),
        PatchKind::Remove => label.red(),
        PatchKind::Replace => label.magenta(),
        PatchKind::Update => label.yellow(),
        PatchKind::Move => label.cyan(),
    }
}

// ---------------------------------------------------------------------------
// tree
// ---------------------------------------------------------------------------

fn cmd_tree(args: TreeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let tree = load_tree(&args.path)?;
    if format == OutputFormat::Json {
        return print_json(&tree);
    }
    for id in tree.preorder() {
        let mut depth = 0;
        let mut cursor = tree.parent(id);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = tree.parent(parent);
        }
        let props: Vec<String> = tree[id]
            .props
            .iter()
            .filter(|_| !tree[id].kind.is_text())
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        println!(
            "{}{} {} {}",
            "  ".repeat(depth),
            id.to_string().dimmed(),
            describe(&tree, id).bold(),
            props.join(" ")
        );
    }
    println!("{} nodes", tree.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

enum Patches {
    Keyed(PatchSet),
    Positional(IndexedPatches),
}

struct DiffOutcome {
    old: VTree,
    new: VTree,
    patches: Patches,
}

impl DiffOutcome {
    fn len(&self) -> usize {
        match &self.patches {
            Patches::Keyed(patches) => patches.len(),
            Patches::Positional(patches) => patches.len(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match &self.patches {
            Patches::Keyed(patches) => json!({
                "strategy": Strategy::Keyed,
                "count": patches.len(),
                "patches": patches,
            }),
            Patches::Positional(patches) => json!({
                "strategy": Strategy::Positional,
                "count": patches.len(),
                "patches": patches,
            }),
        }
    }
}

fn compute_diff(args: &DiffArgs) -> anyhow::Result<DiffOutcome> {
    let old = load_tree(&args.old)?;
    let mut new = load_tree(&args.new)?;
    let only = args.only.as_deref().map(str::parse::<PatchKind>).transpose()?;

    let patches = match args.strategy {
        StrategyArg::Keyed => {
            let patches = diff_keyed(Some(&old), &mut new)?;
            Patches::Keyed(match only {
                Some(kind) => {
                    let kept: Vec<Patch> = patches
                        .iter()
                        .filter(|p| p.kind() == kind)
                        .cloned()
                        .collect();
                    PatchSet::from(kept)
                }
                None => patches,
            })
        }
        StrategyArg::Positional => {
            let patches = diff_positional(&old, &mut new)?;
            Patches::Positional(match only {
                Some(kind) => {
                    let mut kept = IndexedPatches::new();
                    for (index, patch) in patches.iter().filter(|(_, p)| p.kind() == kind) {
                        kept.push(index, patch.clone());
                    }
                    kept
                }
                None => patches,
            })
        }
    };
    Ok(DiffOutcome { old, new, patches })
}

fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = compute_diff(&args)?;
    if format == OutputFormat::Json {
        return print_json(&outcome.to_json());
    }
    if outcome.len() == 0 {
        println!("No changes.");
        return Ok(());
    }

    let (old, new) = (&outcome.old, &outcome.new);
    match &outcome.patches {
        Patches::Keyed(patches) => {
            for patch in patches {
                let detail = match patch {
                    Patch::Insert { new: id } => describe(new, *id),
                    Patch::Remove { old: id } => describe(old, *id),
                    Patch::Replace { old: from, new: to } => {
                        format!("{} → {}", describe(old, *from), describe(new, *to))
                    }
                    Patch::Update { new: id, delta, .. } => {
                        format!("{}  {}", describe(new, *id), describe_delta(delta))
                    }
                    Patch::Move { new: id, from, to, .. } => {
                        format!("{}  {from} → {to}", describe(new, *id))
                    }
                };
                println!("{} {}", kind_label(patch.kind()), detail);
            }
        }
        Patches::Positional(patches) => {
            for (index, patch) in patches.iter() {
                let detail = match patch {
                    IndexedPatch::Insert { node, position } => {
                        format!("{} at {position}", describe(new, *node))
                    }
                    IndexedPatch::Remove => String::new(),
                    IndexedPatch::Replace { node } => describe(new, *node),
                    IndexedPatch::Update { delta } => describe_delta(delta),
                    IndexedPatch::Move { to } => format!("to {to}"),
                };
                println!(
                    "{} {} {}",
                    format!("@{index:<4}").dimmed(),
                    kind_label(patch.kind()),
                    detail
                );
            }
        }
    }
    println!("{} patches", outcome.len().to_string().bold());
    Ok(())
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ApplyOutcome {
    summary: RenderSummary,
    /// Host nodes created by the update, mount excluded.
    created: usize,
    markup: String,
}

fn run_apply(args: &ApplyArgs) -> anyhow::Result<ApplyOutcome> {
    let strategy = strategy(args.strategy);
    let mut renderer = Renderer::in_memory("root");
    renderer.render_with(load_element(&args.old)?, strategy)?;
    let before = renderer.host().created();
    let summary = renderer.render_with(load_element(&args.new)?, strategy)?;
    Ok(ApplyOutcome {
        summary,
        created: renderer.host().created() - before,
        markup: renderer.markup(),
    })
}

fn cmd_apply(args: ApplyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = run_apply(&args)?;
    if format == OutputFormat::Json {
        return print_json(&outcome);
    }
    println!("{}", outcome.markup);
    println!(
        "{} {} patches applied ({}), {} host nodes created",
        "✓".green().bold(),
        outcome.summary.patches,
        outcome.summary.strategy,
        outcome.created
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SliceRecord {
    trigger: &'static str,
    /// Units processed so far when the slice ended.
    units: usize,
}

#[derive(Debug, Serialize)]
struct ScheduleOutcome {
    config: SchedulerConfig,
    slices: Vec<SliceRecord>,
    patches: usize,
    units: usize,
    markup: String,
}

fn run_schedule(args: &ScheduleArgs) -> anyhow::Result<ScheduleOutcome> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SchedulerConfig::default(),
    };
    if let Some(ms) = args.frame_budget_ms {
        if !(ms.is_finite() && ms > 0.0) {
            bail!("--frame-budget-ms must be a positive number, got {ms}");
        }
        config.frame_budget = match Duration::try_from_secs_f64(ms / 1000.0) {
            Ok(budget) => budget,
            Err(err) => bail!("--frame-budget-ms {ms} is out of range: {err}"),
        };
        config.idle_timeout = config.frame_budget;
    }
    if !(args.idle_ms.is_finite() && args.idle_ms >= 0.0) {
        bail!("--idle-ms must be a non-negative number, got {}", args.idle_ms);
    }
    let idle = match Duration::try_from_secs_f64(args.idle_ms / 1000.0) {
        Ok(idle) => idle,
        Err(err) => bail!("--idle-ms {} is out of range: {err}", args.idle_ms),
    };
    let priority = match args.priority {
        PriorityArg::Frame => Priority::Frame,
        PriorityArg::Idle => Priority::Idle,
    };

    let frames = Arc::new(ManualFrameHost::new());
    let scheduler = Scheduler::new(
        config.clone(),
        Arc::new(ManualClock::with_step(Duration::from_micros(args.unit_cost_us))),
        frames.clone(),
    )?;

    let mut renderer = Renderer::in_memory("root");
    renderer.render(load_element(&args.old)?)?;

    let slot: Arc<Mutex<Option<DiffResult<Completion>>>> = Arc::default();
    let sink = slot.clone();
    renderer.schedule(&scheduler, load_element(&args.new)?, priority, move |result| {
        *sink.lock().expect("lock poisoned") = Some(result);
    })?;

    let mut slices = Vec::new();
    let done = loop {
        if let Some(result) = slot.lock().expect("lock poisoned").take() {
            break result?;
        }
        let (trigger, statuses) = if frames.pending_frames() > 0 {
            ("frame", frames.fire_frame())
        } else if frames.pending_idle() > 0 {
            ("idle", frames.fire_idle(idle))
        } else if frames.armed_timers() > 0 {
            ("timer", frames.fire_timers())
        } else {
            bail!("scheduler stalled with no pending trigger");
        };
        if statuses.iter().any(|s| *s != WorkStatus::Stale) {
            let units = scheduler.progress().map_or(0, |(_, units)| units);
            slices.push(SliceRecord { trigger, units });
        }
    };

    if let Some(last) = slices.last_mut() {
        last.units = done.units;
    }
    let (patches, units) = (done.patches.len(), done.units);
    renderer.commit(done)?;
    Ok(ScheduleOutcome {
        config,
        slices,
        patches,
        units,
        markup: renderer.markup(),
    })
}

fn cmd_schedule(args: ScheduleArgs, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = run_schedule(&args)?;
    if format == OutputFormat::Json {
        return print_json(&outcome);
    }
    println!(
        "Frame budget {:?}, {}µs per unit",
        outcome.config.frame_budget, args.unit_cost_us
    );
    let mut previous = 0;
    for (i, slice) in outcome.slices.iter().enumerate() {
        println!(
            "  slice {:>3} ({:<5}) +{} units",
            i + 1,
            slice.trigger,
            slice.units - previous
        );
        previous = slice.units;
    }
    println!("{}", outcome.markup);
    println!(
        "{} {} units in {} slices, {} patches applied",
        "✓".green().bold(),
        outcome.units,
        outcome.slices.len(),
        outcome.patches
    );
    Ok(())
}
