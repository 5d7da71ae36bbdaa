use crate::error::Rs3Error;

// ---------------------------------------------------------------------------
// Table layouts
// ---------------------------------------------------------------------------

/// Header of `NRM_<Folder>.txt`.
pub const NRM_HEADERS: &[&str] = &["Sample", "Sdec", "Idec", "Bdec", "BInc", "NRM_(A/m)"];

/// Header of `Summary_Components_<Folder>.txt`.
pub const COMPONENT_HEADERS: &[&str] = &[
    "Sample", "Sdec", "Idec", "Bdec", "BInc", "NRM_(A/m)", "Component", "M(A/m)", "Dec_spe",
    "Inc_spe", "Dec_geo", "Inc_geo", "Dec_tilt", "Inc_tilt", "MAD", "Limit1", "Limit2",
];

/// Header of `Mean_Int_NRM_<Folder>.txt`.
pub const NRM_SUMMARY_HEADERS: &[&str] = &["Site", "n", "NRM_comp_mean_(A/m)", "stdev"];

/// Header of `Mean_Int_Summary_Components_<Folder>.txt`.
pub const COMPONENT_SUMMARY_HEADERS: &[&str] = &[
    "Site",
    "n",
    "NRM_comp_mean_(A/m)",
    "stdev",
    "Comp_mean_(A/m)",
    "stdev",
    "n_Th",
    "n_AF",
    "Tmin_mean(C)",
    "Tmax_mean(C)",
    "Coerc-min_mean(mT)",
    "Coerc-max_mean(mT)",
];

/// Column positions shared by both intermediate tables.
pub mod columns {
    pub const SAMPLE: usize = 0;
    pub const NRM: usize = 5;
    pub const COMPONENT_INTENSITY: usize = 7;
    pub const LIMIT1: usize = 15;
    pub const LIMIT2: usize = 16;
}

// ---------------------------------------------------------------------------
// SpecimenInfo – shared per-file metadata
// ---------------------------------------------------------------------------

/// Specimen name plus specimen and bedding orientation, taken verbatim from
/// the first data line of an `.rs3` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecimenInfo {
    pub sample: String,
    /// Specimen declination.
    pub sdec: String,
    /// Specimen inclination.
    pub idec: String,
    /// Bedding dip direction.
    pub bdec: String,
    /// Bedding dip.
    pub binc: String,
}

impl SpecimenInfo {
    pub fn fields(&self) -> [&str; 5] {
        [&self.sample, &self.sdec, &self.idec, &self.bdec, &self.binc]
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One specimen's NRM reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NrmRow {
    pub specimen: SpecimenInfo,
    /// Intensity in A/m, kept as the original token.
    pub nrm: String,
}

impl NrmRow {
    pub fn record(&self) -> Vec<&str> {
        let mut rec = self.specimen.fields().to_vec();
        rec.push(&self.nrm);
        rec
    }
}

/// The eleven fields of a fitted-component (`C`) line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedComponent {
    pub label: String,
    /// Component intensity M in A/m.
    pub intensity: String,
    pub dec_spe: String,
    pub inc_spe: String,
    pub dec_geo: String,
    pub inc_geo: String,
    pub dec_tilt: String,
    pub inc_tilt: String,
    pub mad: String,
    pub limit1: String,
    pub limit2: String,
}

impl FittedComponent {
    /// Build from exactly eleven tokens in file order.
    pub fn from_tokens(tokens: &[&str]) -> Option<Self> {
        let [label, intensity, dec_spe, inc_spe, dec_geo, inc_geo, dec_tilt, inc_tilt, mad, limit1, limit2] =
            tokens
        else {
            return None;
        };
        Some(FittedComponent {
            label: label.to_string(),
            intensity: intensity.to_string(),
            dec_spe: dec_spe.to_string(),
            inc_spe: inc_spe.to_string(),
            dec_geo: dec_geo.to_string(),
            inc_geo: inc_geo.to_string(),
            dec_tilt: dec_tilt.to_string(),
            inc_tilt: inc_tilt.to_string(),
            mad: mad.to_string(),
            limit1: limit1.to_string(),
            limit2: limit2.to_string(),
        })
    }

    pub fn fields(&self) -> [&str; 11] {
        [
            &self.label,
            &self.intensity,
            &self.dec_spe,
            &self.inc_spe,
            &self.dec_geo,
            &self.inc_geo,
            &self.dec_tilt,
            &self.inc_tilt,
            &self.mad,
            &self.limit1,
            &self.limit2,
        ]
    }
}

/// One fitted component together with its specimen's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRow {
    pub specimen: SpecimenInfo,
    /// NRM of the specimen; `None` when the file had no NRM line.
    pub nrm: Option<String>,
    pub component: FittedComponent,
}

impl ComponentRow {
    pub fn record(&self) -> Vec<&str> {
        let mut rec = self.specimen.fields().to_vec();
        rec.push(self.nrm.as_deref().unwrap_or(""));
        rec.extend(self.component.fields());
        rec
    }
}

/// Everything extracted from one `.rs3` file.
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub nrm: Option<NrmRow>,
    pub components: Vec<ComponentRow>,
    /// Row-level problems; the offending lines were skipped.
    pub issues: Vec<Rs3Error>,
}

impl ParsedFile {
    pub fn is_empty(&self) -> bool {
        self.nrm.is_none() && self.components.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Limit – bounding step of a fitted component
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitUnit {
    /// Thermal step, suffix `C`.
    Celsius,
    /// Alternating-field step, suffix `mT`.
    Millitesla,
}

impl LimitUnit {
    /// Unit implied by a limit token's suffix, if any.
    pub fn of(token: &str) -> Option<Self> {
        if token.ends_with('C') {
            Some(LimitUnit::Celsius)
        } else if token.ends_with("mT") {
            Some(LimitUnit::Millitesla)
        } else {
            None
        }
    }
}

/// A parsed `Limit1`/`Limit2` field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    /// Temperature in °C.
    Temperature(f64),
    /// Peak field in mT.
    Coercivity(f64),
    Unrecognized,
}

impl Limit {
    /// Parse a token such as `350C` or `20mT`.
    ///
    /// A recognised suffix with a non-numeric value is an error; an unknown
    /// suffix is `Unrecognized`.
    pub fn parse(token: &str) -> Result<Self, std::num::ParseFloatError> {
        let token = token.trim();
        match LimitUnit::of(token) {
            Some(LimitUnit::Celsius) => {
                let value = token[..token.len() - 1].trim().parse::<f64>()?;
                Ok(Limit::Temperature(value))
            }
            Some(LimitUnit::Millitesla) => {
                let value = token[..token.len() - 2].trim().parse::<f64>()?;
                Ok(Limit::Coercivity(value))
            }
            None => Ok(Limit::Unrecognized),
        }
    }
}

/// Demagnetization range of a component, classified from its two limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DemagRange {
    Thermal { min: f64, max: f64 },
    AlternatingField { min: f64, max: f64 },
    Unclassified,
}
