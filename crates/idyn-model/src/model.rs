//! Static description of a fixed-base articulated robot.

use crate::{Joint, Link};
use idyn_math::{DVec, PARAMS_PER_LINK, SpatialInertia, Vec3};

/// Fixed-base kinematic tree.
///
/// The base link is not part of `links`: it is the world-attached root and
/// carries no identified parameters. Every entry of `links` owns one
/// parameter block, in link order, and links are ordered parent before child.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    /// Name of the fixed root link.
    pub base: String,
    pub links: Vec<Link>,
    /// Total number of DOFs.
    pub ndof: usize,
    /// DOF offset for each link's joint (fixed joints share the next offset).
    pub dof_offsets: Vec<usize>,
}

impl Model {
    /// Number of links with identified parameters.
    pub fn nlinks(&self) -> usize {
        self.links.len()
    }

    /// Length of the standard parameter vector.
    pub fn nparams(&self) -> usize {
        PARAMS_PER_LINK * self.links.len()
    }

    /// Joint names of all moving joints, in DOF order.
    pub fn dof_names(&self) -> Vec<String> {
        self.links
            .iter()
            .filter(|l| l.joint.ndof() > 0)
            .map(|l| l.joint.name.clone())
            .collect()
    }

    /// DOF index of the moving joint called `name`.
    pub fn dof_index(&self, name: &str) -> Option<usize> {
        self.links
            .iter()
            .enumerate()
            .find(|(_, l)| l.joint.ndof() > 0 && l.joint.name == name)
            .map(|(i, _)| self.dof_offsets[i])
    }

    pub fn link_names(&self) -> Vec<String> {
        self.links.iter().map(|l| l.name.clone()).collect()
    }

    /// Position of each joint relative to its parent link (rest transform
    /// translation), one entry per link.
    pub fn link_offsets(&self) -> Vec<Vec3> {
        self.links.iter().map(|l| l.joint.parent_to_joint.pos).collect()
    }

    /// Standard parameter vector (link-frame form) of the model's priors.
    pub fn parameters(&self) -> DVec {
        let mut p = DVec::zeros(self.nparams());
        for (i, link) in self.links.iter().enumerate() {
            let block = link.inertia.to_link_params();
            p.rows_mut(i * PARAMS_PER_LINK, PARAMS_PER_LINK)
                .copy_from_slice(&block);
        }
        p
    }
}

/// Builder for constructing models.
pub struct ModelBuilder {
    name: String,
    base: String,
    links: Vec<Link>,
}

impl ModelBuilder {
    /// Start a model whose fixed root link is called `base`.
    pub fn new(name: &str, base: &str) -> Self {
        Self {
            name: name.to_string(),
            base: base.to_string(),
            links: Vec::new(),
        }
    }

    /// Add a link attached to `parent` through `joint`.
    ///
    /// `parent` is the index of a previously added link, or -1 for the base.
    /// `inertia` is the link's barycentric inertia in its own frame.
    pub fn add_link(
        mut self,
        name: &str,
        parent: i32,
        joint: Joint,
        inertia: SpatialInertia,
    ) -> Self {
        self.links.push(Link {
            name: name.to_string(),
            parent,
            joint,
            inertia,
        });
        self
    }

    /// Build the model.
    ///
    /// Panics if a link refers to a parent that was not added before it.
    pub fn build(self) -> Model {
        let mut ndof = 0;
        let mut dof_offsets = Vec::with_capacity(self.links.len());
        for (i, link) in self.links.iter().enumerate() {
            assert!(
                link.parent < i as i32,
                "link {} must be added after its parent {}",
                link.name,
                link.parent
            );
            dof_offsets.push(ndof);
            ndof += link.joint.ndof();
        }

        Model {
            name: self.name,
            base: self.base,
            links: self.links,
            ndof,
            dof_offsets,
        }
    }
}
