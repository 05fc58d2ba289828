//! Joint refinement of intrinsics and per-view target poses.
//!
//! Parameter vector: `[free intrinsics | rvec_0 tvec_0 | rvec_1 tvec_1 | ...]`,
//! where the free intrinsics are chosen by an [`IntrinsicsLayout`].
//! Residuals are `projected - detected` pixel offsets, two rows per point.
//!
//! Each view depends only on the shared intrinsics block and its own pose
//! block, so the Jacobian is assembled per view: autodiff over a small local
//! vector, then scattered into the global matrix.

use arpose_core::{CorrespondenceView, ExtrinsicPose, IntrinsicModel, Real};
use nalgebra::{Const, DMatrix, DVector, Dyn, OMatrix, SVector};
use num_dual::{jacobian, DualSVec64};

use crate::params::{pack_pose, unpack_pose, IntrinsicsLayout, MAX_INTRINSICS_DIM, POSE_DIM};
use crate::reprojection::view_residuals;
use crate::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

/// Local parameters of one view: intrinsics padded to [`MAX_INTRINSICS_DIM`]
/// followed by the pose. Padding slots are never read.
const LOCAL_DIM: usize = MAX_INTRINSICS_DIM + POSE_DIM;

#[derive(Debug, Clone)]
pub struct PlanarIntrinsicsProblem<'a> {
    views: &'a [CorrespondenceView],
    layout: IntrinsicsLayout,
    /// First residual row of each view.
    row_offsets: Vec<usize>,
    num_residuals: usize,
}

impl<'a> PlanarIntrinsicsProblem<'a> {
    pub fn new(views: &'a [CorrespondenceView], layout: IntrinsicsLayout) -> Self {
        let mut row_offsets = Vec::with_capacity(views.len());
        let mut rows = 0;
        for view in views {
            row_offsets.push(rows);
            rows += 2 * view.len();
        }
        Self {
            views,
            layout,
            row_offsets,
            num_residuals: rows,
        }
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    fn pose_offset(&self, view_idx: usize) -> usize {
        self.layout.dim() + POSE_DIM * view_idx
    }

    pub fn pack(&self, model: &IntrinsicModel, poses: &[ExtrinsicPose]) -> DVector<Real> {
        debug_assert_eq!(poses.len(), self.num_views());
        let mut x = DVector::zeros(self.num_params());
        let k_dim = self.layout.dim();
        self.layout.pack(model, &mut x.as_mut_slice()[..k_dim]);
        for (idx, pose) in poses.iter().enumerate() {
            let off = self.pose_offset(idx);
            pack_pose(pose, &mut x.as_mut_slice()[off..off + POSE_DIM]);
        }
        x
    }

    pub fn unpack(&self, x: &DVector<Real>) -> (IntrinsicModel, Vec<ExtrinsicPose>) {
        let model = self.layout.unpack(&x.as_slice()[..self.layout.dim()]);
        let poses = (0..self.num_views())
            .map(|idx| {
                let off = self.pose_offset(idx);
                unpack_pose(&x.as_slice()[off..off + POSE_DIM])
            })
            .collect();
        (model, poses)
    }

    fn local_params(&self, x: &DVector<Real>, view_idx: usize) -> SVector<Real, LOCAL_DIM> {
        let k_dim = self.layout.dim();
        let off = self.pose_offset(view_idx);
        let mut local = SVector::<Real, LOCAL_DIM>::zeros();
        local.as_mut_slice()[..k_dim].copy_from_slice(&x.as_slice()[..k_dim]);
        local.as_mut_slice()[MAX_INTRINSICS_DIM..]
            .copy_from_slice(&x.as_slice()[off..off + POSE_DIM]);
        local
    }

    fn scatter(
        &self,
        jac: &mut DMatrix<Real>,
        j_view: &OMatrix<Real, Dyn, Const<LOCAL_DIM>>,
        view_idx: usize,
    ) {
        let k_dim = self.layout.dim();
        let start = self.row_offsets[view_idx];
        let off = self.pose_offset(view_idx);
        for row in 0..j_view.nrows() {
            for col in 0..k_dim {
                jac[(start + row, col)] = j_view[(row, col)];
            }
            for k in 0..POSE_DIM {
                jac[(start + row, off + k)] = j_view[(row, MAX_INTRINSICS_DIM + k)];
            }
        }
    }
}

impl NllsProblem for PlanarIntrinsicsProblem<'_> {
    fn num_params(&self) -> usize {
        self.layout.dim() + POSE_DIM * self.num_views()
    }

    fn num_residuals(&self) -> usize {
        self.num_residuals
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let (k, dist) = self.layout.unpack_params(&x.as_slice()[..self.layout.dim()]);
        let mut r = DVector::zeros(self.num_residuals);
        for (idx, view) in self.views.iter().enumerate() {
            let start = self.row_offsets[idx];
            let off = self.pose_offset(idx);
            let rv = view_residuals(&k, &dist, &x.as_slice()[off..off + POSE_DIM], view);
            r.rows_mut(start, rv.len()).copy_from(&rv);
        }
        r
    }

    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let k_dim = self.layout.dim();
        let mut jac = DMatrix::zeros(self.num_residuals, self.num_params());
        for (idx, view) in self.views.iter().enumerate() {
            let (_, j_view) = jacobian(
                |p: SVector<DualSVec64<LOCAL_DIM>, LOCAL_DIM>| {
                    let p = p.as_slice();
                    let (k, dist) = self.layout.unpack_params(&p[..k_dim]);
                    view_residuals(&k, &dist, &p[MAX_INTRINSICS_DIM..], view)
                },
                self.local_params(x, idx),
            );
            self.scatter(&mut jac, &j_view, idx);
        }
        jac
    }
}

/// Refined intrinsics and poses with the solver's report.
#[derive(Debug, Clone)]
pub struct PlanarIntrinsicsFit {
    pub model: IntrinsicModel,
    pub poses: Vec<ExtrinsicPose>,
    pub report: SolveReport,
}

/// Run bundle adjustment from an initial model and initial per-view poses.
pub fn refine_planar_intrinsics<B: NllsSolverBackend>(
    backend: &B,
    problem: &PlanarIntrinsicsProblem<'_>,
    init_model: &IntrinsicModel,
    init_poses: &[ExtrinsicPose],
    opts: &SolveOptions,
) -> PlanarIntrinsicsFit {
    let x0 = problem.pack(init_model, init_poses);
    let (x, report) = backend.solve(problem, x0, opts);
    let (model, poses) = problem.unpack(&x);
    PlanarIntrinsicsFit {
        model,
        poses,
        report,
    }
}
