//! SE(3)-magnitude pose penalty.

use xrt_core::dist::DistPtr;
use xrt_core::frame::{rot_mag, trans_mag};

use crate::error::{RegiError, Result};

use super::trait_::{PenaltyContext, PenaltyFn};

/// Negative log-likelihood of the rotation and translation magnitudes of
/// each object's candidate-vs-guess pose delta.
///
/// Rotation and translation are scored independently under per-object
/// prior distributions. Prior handles are shared ([`DistPtr`]); one
/// distribution instance may back several objects.
pub struct Se3MagPenalty {
    pub rot_pdfs_per_obj: Vec<DistPtr>,
    pub trans_pdfs_per_obj: Vec<DistPtr>,
    /// Objects with regularization disabled are skipped entirely; they
    /// contribute exactly zero, which is different from a prior centered
    /// at zero.
    pub apply_reg_for_obj: Vec<bool>,
}

impl Se3MagPenalty {
    pub fn new(
        rot_pdfs_per_obj: Vec<DistPtr>,
        trans_pdfs_per_obj: Vec<DistPtr>,
        apply_reg_for_obj: Vec<bool>,
    ) -> Self {
        Self {
            rot_pdfs_per_obj,
            trans_pdfs_per_obj,
            apply_reg_for_obj,
        }
    }
}

impl PenaltyFn for Se3MagPenalty {
    fn compute(&self, ctx: &PenaltyContext<'_>) -> Result<f64> {
        let num_objs = ctx.cams_wrt_objs.len();

        // A mis-sized prior configuration is a caller bug, never something
        // to silently truncate.
        if self.rot_pdfs_per_obj.len() != num_objs
            || self.trans_pdfs_per_obj.len() != num_objs
            || self.apply_reg_for_obj.len() != num_objs
        {
            return Err(RegiError::invalid_state(format!(
                "penalty configured for {} rotation pdfs, {} translation pdfs, {} flags, \
                 but {} objects are tracked",
                self.rot_pdfs_per_obj.len(),
                self.trans_pdfs_per_obj.len(),
                self.apply_reg_for_obj.len(),
                num_objs
            )));
        }

        if ctx.regi_xform_guesses.len() != num_objs {
            return Err(RegiError::invalid_state(format!(
                "{} pose guesses supplied for {} objects",
                ctx.regi_xform_guesses.len(),
                num_objs
            )));
        }

        let mut penalty = 0.0;

        for obj in 0..num_objs {
            if !self.apply_reg_for_obj[obj] {
                continue;
            }

            let guess_inv = ctx.regi_xform_guesses[obj].inverse();

            for pose in &ctx.cams_wrt_objs[obj] {
                let delta = pose * guess_inv;

                penalty -= self.rot_pdfs_per_obj[obj].log_prob(rot_mag(&delta));
                penalty -= self.trans_pdfs_per_obj[obj].log_prob(trans_mag(&delta));
            }
        }

        Ok(penalty)
    }
}
