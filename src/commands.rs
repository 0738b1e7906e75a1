//! CLI Command Handlers
//!
//! Implements all CLI commands by calling the explorer and API clients.
//! Each handler takes CLI args, config, and Output, returns ExitCode.

use crate::api::census::CensusError;
use crate::api::geo::GeoError;
use crate::api::naics::NaicsError;
use crate::cli::{
    validate_code, validate_zip, ChildrenCmd, CountyCmd, DrillCmd, ExitCode, Output, RankArgs,
    TopCmd, TreeCmd,
};
use crate::config::{Config, ConfigError};
use crate::explorer::{naics_client, ExplorerError, IndustryExplorer};
use crate::models::Metric;

/// Map a failure to its semantic exit code
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if let Some(e) = err.downcast_ref::<GeoError>() {
        return match e {
            GeoError::NotFound(_) => ExitCode::ZipNotFound,
            GeoError::Unauthorized(_) => ExitCode::AuthError,
            _ => ExitCode::NetworkError,
        };
    }
    if let Some(e) = err.downcast_ref::<CensusError>() {
        return match e {
            CensusError::Unauthorized(_) => ExitCode::AuthError,
            _ => ExitCode::NetworkError,
        };
    }
    if let Some(e) = err.downcast_ref::<NaicsError>() {
        return match e {
            NaicsError::InvalidCode(_) => ExitCode::InvalidArgs,
            _ => ExitCode::NetworkError,
        };
    }
    if err.downcast_ref::<ExplorerError>().is_some() {
        return ExitCode::NoData;
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return ExitCode::AuthError;
    }
    ExitCode::Error
}

fn fail(output: &Output, context: &str, err: anyhow::Error) -> ExitCode {
    output.error(format!("{}: {:#}", context, err), exit_code_for(&err))
}

fn rank_options(rank: &RankArgs, config: &Config) -> (Metric, usize) {
    let metric = rank.metric.map(Metric::from).unwrap_or_else(|| config.metric());
    let limit = rank.limit.unwrap_or_else(|| config.limit());
    (metric, limit)
}

fn explorer(config: &Config, output: &Output) -> Result<IndustryExplorer, ExitCode> {
    IndustryExplorer::from_config(config).map_err(|e| fail(output, "Configuration", e))
}

// =============================================================================
// County Command
// =============================================================================

pub async fn county_cmd(cmd: CountyCmd, config: &Config, output: &Output) -> ExitCode {
    let zip = match validate_zip(&cmd.zip) {
        Ok(zip) => zip,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };
    let explorer = match explorer(config, output) {
        Ok(explorer) => explorer,
        Err(code) => return code,
    };

    output.info(format!("Resolving ZIP {}", zip));

    match explorer.resolve_county(&zip).await {
        Ok(county) => {
            if let Err(e) = output.print(&county) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => fail(output, "ZIP lookup failed", e),
    }
}

// =============================================================================
// Top Command
// =============================================================================

pub async fn top_cmd(cmd: TopCmd, config: &Config, output: &Output) -> ExitCode {
    let zip = match validate_zip(&cmd.zip) {
        Ok(zip) => zip,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };
    let explorer = match explorer(config, output) {
        Ok(explorer) => explorer,
        Err(code) => return code,
    };
    let (metric, limit) = rank_options(&cmd.rank, config);

    output.info(format!("Ranking sectors for ZIP {} by {}", zip, metric));

    match explorer.report_for_zip(&zip, metric, limit).await {
        Ok(report) => {
            if let Err(e) = output.print(&report) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => fail(output, "Sector ranking failed", e),
    }
}

// =============================================================================
// Drill Command
// =============================================================================

pub async fn drill_cmd(cmd: DrillCmd, config: &Config, output: &Output) -> ExitCode {
    let zip = match validate_zip(&cmd.zip) {
        Ok(zip) => zip,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };
    let code = match validate_code(&cmd.code) {
        Ok(code) => code,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };
    let explorer = match explorer(config, output) {
        Ok(explorer) => explorer,
        Err(code) => return code,
    };
    let (metric, limit) = rank_options(&cmd.rank, config);

    output.info(format!("Drilling into {} for ZIP {} by {}", code, zip, metric));

    let county = match explorer.resolve_county(&zip).await {
        Ok(county) => county,
        Err(e) => return fail(output, "ZIP lookup failed", e),
    };

    match explorer.drill_down(&county, code, metric, limit).await {
        Ok(report) => {
            if let Err(e) = output.print(&report) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => fail(output, "Drill-down failed", e),
    }
}

// =============================================================================
// Tree Command
// =============================================================================

pub async fn tree_cmd(cmd: TreeCmd, config: &Config, output: &Output) -> ExitCode {
    let zip = match validate_zip(&cmd.zip) {
        Ok(zip) => zip,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };
    let root = match cmd.root.as_deref().map(validate_code).transpose() {
        Ok(root) => root,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };
    if cmd.depth == 0 {
        return output.error("Depth must be at least 1", ExitCode::InvalidArgs);
    }
    let explorer = match explorer(config, output) {
        Ok(explorer) => explorer,
        Err(code) => return code,
    };
    let (metric, limit) = rank_options(&cmd.rank, config);

    output.info(format!(
        "Expanding {} level(s) for ZIP {} by {}",
        cmd.depth, zip, metric
    ));

    let county = match explorer.resolve_county(&zip).await {
        Ok(county) => county,
        Err(e) => return fail(output, "ZIP lookup failed", e),
    };

    match explorer.explore(&county, root, metric, limit, cmd.depth).await {
        Ok(tree) => {
            if let Err(e) = output.print(&tree) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => fail(output, "Tree expansion failed", e),
    }
}

// =============================================================================
// Children Command
// =============================================================================

pub async fn children_cmd(cmd: ChildrenCmd, config: &Config, output: &Output) -> ExitCode {
    let code = match validate_code(&cmd.code) {
        Ok(code) => code,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };

    // Taxonomy lookups need no credentials
    let client = naics_client(config);

    match client.children(code).await {
        Ok(children) if children.children.is_empty() => output.error(
            format!("{} has no child industries", code),
            ExitCode::NoData,
        ),
        Ok(children) => {
            if let Err(e) = output.print(&children) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => fail(output, "Taxonomy lookup failed", e),
    }
}
