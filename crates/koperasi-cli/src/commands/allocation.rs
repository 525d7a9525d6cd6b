use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use koperasi_core::allocation::proportional::{self, AllocationPool, MemberBasis};
use koperasi_core::allocation::shu::{self, ShuInput};

use crate::input;

/// Arguments for proportional allocation of a fund
#[derive(Args)]
pub struct AllocateArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Fund to distribute
    #[arg(long)]
    pub total_fund: Option<Decimal>,

    /// Member basis as id=amount (repeatable, e.g. --member AG-01=15000000)
    #[arg(long = "member", value_parser = parse_member)]
    pub members: Vec<MemberBasis>,
}

pub fn run_allocate(args: AllocateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pool: AllocationPool = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        AllocationPool {
            total_fund: args
                .total_fund
                .ok_or("--total-fund is required (or provide --input)")?,
            members: args.members,
        }
    };

    debug!(members = pool.members.len(), "allocating pool");
    let result = proportional::build_allocation(&pool)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for SHU distribution
#[derive(Args)]
pub struct ShuArgs {
    /// Path to JSON/YAML input file with components and members
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_shu(args: ShuArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let shu_input: ShuInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file> or stdin required for SHU distribution".into());
    };

    let result = shu::distribute_shu(&shu_input)?;
    Ok(serde_json::to_value(result)?)
}

fn parse_member(raw: &str) -> Result<MemberBasis, String> {
    let (id, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected id=amount, got '{raw}'"))?;
    let basis: Decimal = amount
        .trim()
        .parse()
        .map_err(|e| format!("invalid basis amount '{amount}': {e}"))?;
    Ok(MemberBasis::new(id.trim(), basis))
}
