//! rulecore - roll dice and inspect modifier stacks from the command line

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rulecore::modifiers::keys;
use rulecore::{
    AdvantageState, DamageRelation, DamageType, RawModifier, RollContext, RollEvent, Rules,
    RulesConfig, RulesObserver,
};

/// Modifier stacking and deterministic dice
#[derive(Parser, Debug)]
#[command(name = "rulecore", version, about = "Roll dice against stacked modifiers")]
struct Args {
    /// TOML config file (default: ./rulecore.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Reseed the dice before rolling
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// JSON file of modifiers to load before rolling
    #[arg(short, long, global = true)]
    modifiers: Option<PathBuf>,

    /// Entity making the roll
    #[arg(short, long, global = true, default_value = "player")]
    entity: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Roll a d20
    D20 {
        #[arg(long, conflicts_with = "disadvantage")]
        advantage: bool,

        #[arg(long)]
        disadvantage: bool,

        /// Base key advantage is read for (default: attack)
        #[arg(long)]
        action: Option<String>,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Roll damage, e.g. "2d6+3"
    Damage {
        formula: String,

        /// Double the dice
        #[arg(long)]
        critical: bool,

        /// Damage type to mitigate against the target ("ice" reads as cold)
        #[arg(long = "type", requires = "target")]
        damage_type: Option<DamageType>,

        #[arg(long)]
        target: Option<String>,
    },

    /// Ability check
    Check {
        skill: String,

        #[arg(long)]
        dc: Option<i32>,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Saving throw
    Save {
        ability: String,

        #[arg(long)]
        dc: i32,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Attack roll
    Attack {
        #[arg(long)]
        target: Option<String>,

        #[arg(long)]
        defense: Option<i32>,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Install the debug modifier set, roll, and tick it down
    Demo {
        #[arg(long, default_value_t = 3)]
        rounds: u32,
    },
}

/// One entry of a `--modifiers` file
#[derive(Debug, Deserialize)]
struct ModifierEntry {
    /// Defaults to `--entity`
    #[serde(default)]
    entity: Option<String>,
    #[serde(flatten)]
    modifier: RawModifier,
}

/// Prints every roll as one JSON document on stdout
struct JsonRolls;

impl RulesObserver for JsonRolls {
    fn rolled(&self, event: &RollEvent) {
        print_json(event);
    }
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!(error = %e, "failed to serialize output"),
    }
}

fn init_tracing(filter: &str, json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let json_layer = json_logs.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json_logs).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn load_modifiers(rules: &mut Rules, path: &Path, default_entity: &str) -> Result<()> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading modifiers from {}", path.display()))?;
    let entries: Vec<ModifierEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing modifiers in {}", path.display()))?;

    let mut loaded = 0;
    for entry in &entries {
        let entity = entry.entity.as_deref().unwrap_or(default_entity);
        if rules.modifiers.add_raw(entity, &entry.modifier) {
            loaded += 1;
        } else {
            warn!(entity, key = %entry.modifier.key, id = %entry.modifier.id, "skipped modifier");
        }
    }
    info!(loaded, total = entries.len(), "loaded modifiers");
    Ok(())
}

fn run_demo(rules: &mut Rules, entity: &str, rounds: u32) {
    rules.modifiers.seed_debug_sources(entity);
    print_json(&summary(rules, entity));

    let ctx = RollContext::new(entity).with_tag("melee");
    let attack = rules.attack_roll(&ctx);
    let damage_ctx = RollContext {
        critical: attack.critical(),
        ..ctx
    };
    let damage = rules.roll_damage("1d8+2", &damage_ctx);
    print_json(&rules.mitigate_damage(entity, DamageType::Fire, damage.total));

    for round in 1..=rounds {
        let changed = rules.tick(6.0, true);
        print_json(&json!({ "round": round, "changed": changed }));
    }
    rules.end_scene();
    print_json(&summary(rules, entity));
}

fn summary(rules: &Rules, entity: &str) -> serde_json::Value {
    let modifiers = &rules.modifiers;
    let relations: serde_json::Map<String, serde_json::Value> = DamageType::all()
        .iter()
        .filter_map(|t| match rules.resolve_damage_relation(entity, *t) {
            DamageRelation::Normal => None,
            relation => Some((t.to_string(), json!(relation))),
        })
        .collect();
    json!({
        "entity": entity,
        "ac_bonus": modifiers.total_of(entity, keys::AC_BONUS, 0.0),
        "attack_bonus": modifiers.total_of(entity, keys::ATTACK_BONUS, 0.0),
        "speed": modifiers.total_of(entity, keys::SPEED, 30.0),
        "attack_advantage": modifiers.advantage_of(entity, keys::ATTACK),
        "damage_relations": relations,
        "keys": modifiers.keys_of(entity),
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = RulesConfig::load(args.config.as_deref())?;
    init_tracing(&config.log_filter, args.json_logs);

    let mut rules = Rules::from_config(&config);
    if let Some(seed) = args.seed {
        rules.rolls.set_seed(seed);
    }
    if !rules.rolls.is_reproducible() {
        warn!("dice seed is not persisted; this session cannot be resumed");
    }
    info!(seed = rules.rolls.seed(), status = ?rules.rolls.seed_status(), "dice ready");

    if let Some(path) = &args.modifiers {
        load_modifiers(&mut rules, path, &args.entity)?;
    }
    rules.subscribe(Arc::new(JsonRolls));

    let entity = args.entity.as_str();
    match args.command {
        Command::D20 {
            advantage,
            disadvantage,
            action,
            tags,
        } => {
            let forced = if advantage {
                AdvantageState::Advantage
            } else if disadvantage {
                AdvantageState::Disadvantage
            } else {
                AdvantageState::Normal
            };
            let mut ctx = RollContext::new(entity);
            ctx.action = action;
            ctx.tags = tags;
            rules.roll_d20(&ctx, forced);
        }
        Command::Damage {
            formula,
            critical,
            damage_type,
            target,
        } => {
            let mut ctx = RollContext::new(entity);
            ctx.critical = critical;
            let result = rules.roll_damage(&formula, &ctx);
            if let (Some(damage_type), Some(target)) = (damage_type, target) {
                print_json(&rules.mitigate_damage(&target, damage_type, result.total));
            }
        }
        Command::Check { skill, dc, tags } => {
            let mut ctx = RollContext::new(entity);
            ctx.tags = tags;
            rules.ability_check(&skill, dc, &ctx);
        }
        Command::Save { ability, dc, tags } => {
            let mut ctx = RollContext::new(entity);
            ctx.tags = tags;
            rules.saving_throw(&ability, dc, &ctx);
        }
        Command::Attack {
            target,
            defense,
            tags,
        } => {
            let mut ctx = RollContext::new(entity);
            ctx.target = target;
            ctx.defense = defense;
            ctx.tags = tags;
            rules.attack_roll(&ctx);
        }
        Command::Demo { rounds } => run_demo(&mut rules, entity, rounds),
    }

    Ok(())
}
