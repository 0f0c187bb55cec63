//! Speciation constants (`constants.conf`)
//!
//! Site-calibrated constants for the carbon speciation analysis: per-channel
//! BC multipliers, absorption Ångström exponents (AAE), mass absorption
//! cross-sections (MAC), organic-aerosol ratios, and the chunking window.

use crate::config::ConfFile;
use crate::error::{CassError, Result};

/// Keys for the AE33 channel multipliers, channel order BC1..BC7.
const BC_KEYS: [&str; 7] = ["BC1", "BC2", "BC3", "BC4", "BC5", "BC6", "BC7"];

/// Parsed `constants.conf`.
///
/// Every key is required; a missing or non-numeric value aborts startup with
/// a message naming the key.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciationConstants {
    /// Per-channel multipliers converting averaged BC concentrations to
    /// absorption coefficients. Stored divided by 1000, as consumed by the
    /// analysis.
    pub bc_multipliers: [f64; 7],
    /// Absorption Ångström exponent, biomass burning.
    pub aae_bb: f64,
    /// Absorption Ångström exponent, fossil fuel.
    pub aae_ff: f64,
    /// Absorption Ångström exponent, black carbon.
    pub aae_bc: f64,
    /// Mass absorption cross-section, biomass burning.
    pub mac_bb: f64,
    /// Mass absorption cross-section, fossil fuel.
    pub mac_ff: f64,
    pub poa_poc_ratio: f64,
    pub soa_soc_ratio: f64,
    /// MAC of primary brown carbon.
    pub mac_brc_prim: f64,
    /// MAC of secondary brown carbon.
    pub mac_brc_sec: f64,
    /// Chunk length, in days, for the min-R² scans.
    pub time_delta_days: i64,
}

impl SpeciationConstants {
    /// Load `constants.conf` from the given path.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_conf(&ConfFile::load(path)?)
    }

    /// Resolve from an already-parsed [`ConfFile`].
    pub fn from_conf(conf: &ConfFile) -> Result<Self> {
        let mut bc_multipliers = [0.0; 7];
        for (slot, key) in bc_multipliers.iter_mut().zip(BC_KEYS) {
            *slot = require_f64(conf, key)? / 1000.0;
        }

        let time_delta = require_f64(conf, "Time_Delta")? as i64;
        if time_delta < 1 {
            return Err(CassError::InvalidValue {
                key: "Time_Delta".into(),
                reason: "must be at least 1 day".into(),
            });
        }

        Ok(Self {
            bc_multipliers,
            aae_bb: require_f64(conf, "AAE_bb")?,
            aae_ff: require_f64(conf, "AAE_ff")?,
            aae_bc: require_f64(conf, "AAE_bc")?,
            mac_bb: require_f64(conf, "MAC_bb")?,
            mac_ff: require_f64(conf, "MAC_ff")?,
            poa_poc_ratio: require_f64(conf, "POA_POC_Ratio")?,
            soa_soc_ratio: require_f64(conf, "SOA_SOC_Ratio")?,
            mac_brc_prim: require_f64(conf, "MAC_BrC_Prim")?,
            mac_brc_sec: require_f64(conf, "MAC_BrC_Sec")?,
            time_delta_days: time_delta,
        })
    }

    /// The constants in file form, for the analysis run's `constants.csv`.
    /// Multipliers are reported in their configured (x1000) form.
    pub fn report_entries(&self) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = BC_KEYS
            .iter()
            .zip(self.bc_multipliers)
            .map(|(k, v)| (k.to_string(), v * 1000.0))
            .collect();
        out.push(("AAE_bb".into(), self.aae_bb));
        out.push(("AAE_ff".into(), self.aae_ff));
        out.push(("AAE_bc".into(), self.aae_bc));
        out.push(("MAC_bb".into(), self.mac_bb));
        out.push(("MAC_ff".into(), self.mac_ff));
        out.push(("POA_POC_Ratio".into(), self.poa_poc_ratio));
        out.push(("SOA_SOC_Ratio".into(), self.soa_soc_ratio));
        out.push(("MAC_BrC_Prim".into(), self.mac_brc_prim));
        out.push(("MAC_BrC_Sec".into(), self.mac_brc_sec));
        out.push(("Time_Delta".into(), self.time_delta_days as f64));
        out
    }
}

fn require_f64(conf: &ConfFile, key: &str) -> Result<f64> {
    let raw = conf.require(key)?;
    raw.parse::<f64>().map_err(|_| CassError::InvalidValue {
        key: key.to_string(),
        reason: format!("expected a number, got {raw:?}"),
    })
}
