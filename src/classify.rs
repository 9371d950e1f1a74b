//! Severity table and recommendation text.
//!
//! Everything here is a pure function of the mint type, the access evidence
//! and the supply bound.

use crate::access::{AccessEvidence, Confidence};
use crate::finding::{MintType, Severity};
use crate::supply::SupplyBound;

pub const UNBOUNDED_INFLATION: &str = "unbounded inflation risk";

/// Severity for a mint type and access confidence.
///
/// `Medium` is never produced here; it only exists as a `--fail-on` threshold.
pub fn severity_for(mint_type: MintType, confidence: Confidence) -> Severity {
    match (mint_type, confidence) {
        (MintType::PossiblyInherited, _) => Severity::Info,
        (MintType::DeployOnce, _) => Severity::Info,
        (MintType::RuntimeOnly | MintType::DeployPlusRuntime, Confidence::None) => Severity::Critical,
        (MintType::RuntimeOnly | MintType::DeployPlusRuntime, Confidence::Weak) => Severity::High,
        (MintType::RuntimeOnly | MintType::DeployPlusRuntime, Confidence::Strong) => Severity::Info,
    }
}

/// Recommendation text and standalone warnings.
pub fn recommend(
    mint_type: MintType,
    access: &AccessEvidence,
    supply: &SupplyBound,
    inherited_from: &[String],
) -> (String, Vec<String>) {
    let mut lines = Vec::new();
    let mut warnings = Vec::new();

    match mint_type {
        MintType::PossiblyInherited => {
            lines.push(format!(
                "No mint function is defined in this contract, but it inherits {}.",
                inherited_from.join(", ")
            ));
            lines.push(
                "  Inspect the base contracts for public mint functions and their access control."
                    .to_string(),
            );
        }
        MintType::DeployOnce => {
            lines.push(
                "Minting only happens in the constructor/init, which executes at most once; residual risk is low."
                    .to_string(),
            );
            if let Some(bases) = &access.inherited_hint {
                lines.push(format!(
                    "The contract inherits access control ({}).",
                    bases.join(", ")
                ));
            }
        }
        _ => match access.confidence {
            Confidence::None => {
                lines.push(
                    "CRITICAL: the mint function has no access control; any address may mint tokens."
                        .to_string(),
                );
                lines.push(
                    "  Gate minting with onlyOwner, onlyRole or onlyMinter, or require a capability such as TreasuryCap."
                        .to_string(),
                );
            }
            Confidence::Weak => {
                let list = access.inappropriate.join(", ");
                lines.push(format!(
                    "WARNING: mint is only gated by modifiers unrelated to minting ({list})."
                ));
                lines.push(
                    "  Use a dedicated minter/owner check instead of pause or whitelist modifiers."
                        .to_string(),
                );
                warnings.push(format!("inappropriate modifier for mint: {list}"));
            }
            Confidence::Strong => {
                let mut guards: Vec<&str> = access.modifiers.iter().map(String::as_str).collect();
                guards.extend(access.semantic_checks.iter().map(String::as_str));
                match (&access.inherited_hint, guards.is_empty()) {
                    (Some(bases), true) => lines.push(format!(
                        "Mint access control is assumed to come from the inherited base ({}); verify the base implementation.",
                        bases.join(", ")
                    )),
                    _ => lines.push(format!(
                        "The mint function has access control ({}).",
                        guards.join(", ")
                    )),
                }
            }
        },
    }

    if mint_type.is_runtime() && !supply.present {
        lines.push(format!(
            "WARNING: no max supply bound detected - {UNBOUNDED_INFLATION}."
        ));
        lines.push("  Add a maxSupply or cap check to limit minting.".to_string());
        warnings.push(UNBOUNDED_INFLATION.to_string());
    } else if supply.literal_value.is_some() {
        lines.push(format!("Supply bound detected: {}.", supply.describe()));
    } else if supply.parameterized {
        lines.push(
            "The max supply is passed as a constructor/initializer parameter; confirm the deployed value."
                .to_string(),
        );
        warnings.push("max supply depends on a deployment parameter".to_string());
    } else if supply.fixed {
        lines.push("The supply is fixed after deployment.".to_string());
    } else if supply.present {
        lines.push("A max supply bound is present but its value needs manual review.".to_string());
    }

    if let Some(display) = &supply.decimals_normalized
        && supply.literal_value.is_none()
    {
        if supply.minted_at_deploy {
            lines.push(format!("Minted at deployment: {display}."));
        } else {
            lines.push(format!("Per-call mint amount: {display}."));
        }
    }

    (lines.join("\n"), warnings)
}
