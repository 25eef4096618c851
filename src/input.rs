//! Reading events from whitespace-separated text tables
//!
//! Each non-blank line that does not start with `#` is one row. The first
//! token tells the row kind, followed by the run and event numbers:
//!
//! - `cand run event <CANDIDATE_COLUMNS>`: one reconstructed candidate
//! - `gen run event <GENERATOR_COLUMNS>`: the generated decay (simulation)
//!
//! Consecutive rows with the same run and event numbers make up one event.
//! Booleans are written as 0 or 1.

use crate::{
    candidate::{Candidate, MuonQuality},
    event::{Event, EventId},
    numeric::Float,
    truth::GeneratorDecay,
};
use nalgebra::Vector3;
use std::{
    io::{self, BufRead},
    str::FromStr,
};
use thiserror::Error;

/// Columns of a `cand` row after the event identifier
pub const CANDIDATE_COLUMNS: [&str; 46] = [
    "charge", "b_px", "b_py", "b_pz", "b_mass", "vertex_cl", "lxy", "lxy_err",
    "cos_alpha_bs", "cos_alpha_bs_2d", "ctau", "trk_px", "trk_py", "trk_pz", "trk_dca_bs",
    "trk_dca_bs_err", "ks_px", "ks_py", "ks_pz", "pip_px", "pip_py", "pip_pz", "pim_px",
    "pim_py", "pim_pz", "mup_px", "mup_py", "mup_pz", "mum_px", "mum_py", "mum_pz",
    "mup_good", "mup_trk_layers", "mup_pix_layers", "mup_norm_chi2", "mup_dxy", "mup_dz",
    "mum_good", "mum_trk_layers", "mum_pix_layers", "mum_norm_chi2", "mum_dxy", "mum_dz",
    "kstar_mass", "mumu_mass", "mumu_mass_err",
];

/// Columns of a `gen` row after the event identifier
pub const GENERATOR_COLUMNS: [&str; 29] = [
    "b_charge", "trk_charge", "b_px", "b_py", "b_pz", "kst_px", "kst_py", "kst_pz", "trk_px",
    "trk_py", "trk_pz", "ks_px", "ks_py", "ks_pz", "ks_vx", "ks_vy", "ks_vz", "pip_px",
    "pip_py", "pip_pz", "pim_px", "pim_py", "pim_pz", "mup_px", "mup_py", "mup_pz", "mum_px",
    "mum_py", "mum_pz",
];

/// Errors which can occur while reading an event table
#[derive(Debug, Error)]
pub enum InputError {
    /// The underlying reader failed
    #[error("failed to read the event table")]
    Io(#[from] io::Error),

    /// A row could not be decoded
    #[error("line {line}: {message}")]
    Syntax {
        /// One-based line number
        line: usize,
        /// Description of the problem
        message: String,
    },
}

/// Read all events of a table
pub fn read_events(reader: impl BufRead) -> Result<Vec<Event>, InputError> {
    let mut events = Vec::new();
    let mut current: Option<Event> = None;
    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = line_idx + 1;
        let syntax = |message: String| InputError::Syntax {
            line: line_number,
            message,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut row = Row::new(trimmed);
        let kind = row.next_token("row kind").map_err(syntax)?;
        let id = EventId {
            run: row.parse("run").map_err(syntax)?,
            event: row.parse("event").map_err(syntax)?,
        };
        if current.as_ref().map_or(true, |event| event.id != id) {
            events.extend(current.replace(Event::new(id)));
        }
        let event = current.get_or_insert_with(|| Event::new(id));
        match kind {
            "cand" => event.candidates.push(row.candidate().map_err(syntax)?),
            "gen" => {
                if event.truth.is_some() {
                    return Err(syntax(format!("event {id} has two generator rows")));
                }
                event.truth = Some(row.generator_decay().map_err(syntax)?);
            }
            other => return Err(syntax(format!("unknown row kind \"{other}\""))),
        }
        row.finish().map_err(syntax)?;
    }
    events.extend(current);
    Ok(events)
}

/// Format a candidate as a `cand` row
pub fn candidate_row(id: EventId, cand: &Candidate) -> String {
    let mut row = format!("cand {} {} {}", id.run, id.event, cand.charge);
    let mut push = |x: Float| row.push_str(&format!(" {x}"));
    push_vector(&mut push, &cand.b_momentum);
    for x in [
        cand.b_mass,
        cand.vertex_cl,
        cand.flight_length,
        cand.flight_length_err,
        cand.cos_alpha_bs,
        cand.cos_alpha_bs_2d,
        cand.ctau,
    ] {
        push(x);
    }
    push_vector(&mut push, &cand.track_momentum);
    push(cand.track_dca_bs);
    push(cand.track_dca_bs_err);
    for p in [
        &cand.kshort_momentum,
        &cand.pi_plus_momentum,
        &cand.pi_minus_momentum,
        &cand.mu_plus_momentum,
        &cand.mu_minus_momentum,
    ] {
        push_vector(&mut push, p);
    }
    for quality in [&cand.mu_plus_quality, &cand.mu_minus_quality] {
        push(if quality.is_good { 1. } else { 0. });
        push(quality.tracker_layers as Float);
        push(quality.pixel_layers as Float);
        push(quality.norm_chi2);
        push(quality.dxy);
        push(quality.dz);
    }
    push(cand.kstar_mass);
    push(cand.dimuon_mass);
    push(cand.dimuon_mass_err);
    row
}

/// Format a generated decay as a `gen` row
pub fn generator_row(id: EventId, decay: &GeneratorDecay) -> String {
    let mut row = format!(
        "gen {} {} {} {}",
        id.run, id.event, decay.b_charge, decay.track_charge
    );
    let mut push = |x: Float| row.push_str(&format!(" {x}"));
    for p in [
        &decay.b_momentum,
        &decay.kstar_momentum,
        &decay.track_momentum,
        &decay.kshort_momentum,
        &decay.kshort_vertex,
        &decay.pi_plus_momentum,
        &decay.pi_minus_momentum,
        &decay.mu_plus_momentum,
        &decay.mu_minus_momentum,
    ] {
        push_vector(&mut push, p);
    }
    row
}

/// Push the components of a 3-vector
fn push_vector(push: &mut impl FnMut(Float), v: &Vector3<Float>) {
    for &x in v.iter() {
        push(x);
    }
}

/// Tokens of one row, decoded in column order
struct Row<'line> {
    tokens: std::str::SplitWhitespace<'line>,
}
//
impl<'line> Row<'line> {
    fn new(line: &'line str) -> Self {
        Self {
            tokens: line.split_whitespace(),
        }
    }

    /// Next raw token, tagged with the column it should fill
    fn next_token(&mut self, column: &str) -> Result<&'line str, String> {
        self.tokens
            .next()
            .ok_or_else(|| format!("missing column {column}"))
    }

    /// Next token, parsed with the standard parsing logic
    fn parse<T: FromStr>(&mut self, column: &str) -> Result<T, String> {
        let token = self.next_token(column)?;
        token
            .parse::<T>()
            .map_err(|_| format!("could not parse column {column} from \"{token}\""))
    }

    /// Next token as a 0/1 boolean
    fn parse_bool(&mut self, column: &str) -> Result<bool, String> {
        match self.next_token(column)? {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(format!("column {column} should be 0 or 1, not \"{other}\"")),
        }
    }

    /// Next three tokens as a 3-vector
    fn vector(&mut self, column: &str) -> Result<Vector3<Float>, String> {
        Ok(Vector3::new(
            self.parse(column)?,
            self.parse(column)?,
            self.parse(column)?,
        ))
    }

    /// Muon identification block
    fn muon_quality(&mut self, muon: &str) -> Result<MuonQuality, String> {
        Ok(MuonQuality {
            is_good: self.parse_bool(muon)?,
            tracker_layers: self.parse(muon)?,
            pixel_layers: self.parse(muon)?,
            norm_chi2: self.parse(muon)?,
            dxy: self.parse(muon)?,
            dz: self.parse(muon)?,
        })
    }

    /// Remainder of a `cand` row
    fn candidate(&mut self) -> Result<Candidate, String> {
        Ok(Candidate {
            charge: self.parse("charge")?,
            b_momentum: self.vector("b momentum")?,
            b_mass: self.parse("b_mass")?,
            vertex_cl: self.parse("vertex_cl")?,
            flight_length: self.parse("lxy")?,
            flight_length_err: self.parse("lxy_err")?,
            cos_alpha_bs: self.parse("cos_alpha_bs")?,
            cos_alpha_bs_2d: self.parse("cos_alpha_bs_2d")?,
            ctau: self.parse("ctau")?,
            track_momentum: self.vector("track momentum")?,
            track_dca_bs: self.parse("trk_dca_bs")?,
            track_dca_bs_err: self.parse("trk_dca_bs_err")?,
            kshort_momentum: self.vector("K0s momentum")?,
            pi_plus_momentum: self.vector("pi+ momentum")?,
            pi_minus_momentum: self.vector("pi- momentum")?,
            mu_plus_momentum: self.vector("mu+ momentum")?,
            mu_minus_momentum: self.vector("mu- momentum")?,
            mu_plus_quality: self.muon_quality("mu+ quality")?,
            mu_minus_quality: self.muon_quality("mu- quality")?,
            kstar_mass: self.parse("kstar_mass")?,
            dimuon_mass: self.parse("mumu_mass")?,
            dimuon_mass_err: self.parse("mumu_mass_err")?,
        })
    }

    /// Remainder of a `gen` row
    fn generator_decay(&mut self) -> Result<GeneratorDecay, String> {
        Ok(GeneratorDecay {
            b_charge: self.parse("b_charge")?,
            track_charge: self.parse("trk_charge")?,
            b_momentum: self.vector("B momentum")?,
            kstar_momentum: self.vector("K* momentum")?,
            track_momentum: self.vector("track momentum")?,
            kshort_momentum: self.vector("K0s momentum")?,
            kshort_vertex: self.vector("K0s vertex")?,
            pi_plus_momentum: self.vector("pi+ momentum")?,
            pi_minus_momentum: self.vector("pi- momentum")?,
            mu_plus_momentum: self.vector("mu+ momentum")?,
            mu_minus_momentum: self.vector("mu- momentum")?,
        })
    }

    /// Check that the row has no extra column
    fn finish(mut self) -> Result<(), String> {
        match self.tokens.next() {
            None => Ok(()),
            Some(extra) => Err(format!("unexpected extra column \"{extra}\"")),
        }
    }
}
