//! Scene container: geometry, media and the camera's medium.
//!
//! Everything here is read-only while rendering and shared by all workers.

use crate::medium::{GridMedium, HomogeneousMedium, MediumStack, MediumType, MAX_MEDIUM_INDEX};
use crate::primitive::{Intersect, Primitive, PrimitiveList, SurfaceInteraction};
use crate::Ray;

/// Per-type medium arrays addressed by [`MediumStack`] values.
#[derive(Debug, Clone, Default)]
pub struct MediaSet {
    homogeneous: Vec<HomogeneousMedium>,
    grid: Vec<GridMedium>,
}

impl MediaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// If the homogeneous array already holds `MAX_MEDIUM_INDEX + 1` media.
    pub fn add_homogeneous(&mut self, medium: HomogeneousMedium) -> MediumStack {
        let id = MediumStack::new(MediumType::Homogeneous, self.homogeneous.len());
        self.homogeneous.push(medium);
        id
    }

    /// # Panics
    ///
    /// If the grid array already holds `MAX_MEDIUM_INDEX + 1` media.
    pub fn add_grid(&mut self, medium: GridMedium) -> MediumStack {
        let id = MediumStack::new(MediumType::Grid, self.grid.len());
        self.grid.push(medium);
        id
    }

    pub fn homogeneous(&self, index: usize) -> Option<&HomogeneousMedium> {
        self.homogeneous.get(index)
    }

    pub fn grid(&self, index: usize) -> Option<&GridMedium> {
        self.grid.get(index)
    }

    pub fn len(&self) -> usize {
        self.homogeneous.len() + self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether another medium of `kind` still fits in a [`MediumStack`].
    pub fn has_room(&self, kind: MediumType) -> bool {
        let len = match kind {
            MediumType::Vacuum => 0,
            MediumType::Homogeneous => self.homogeneous.len(),
            MediumType::Grid => self.grid.len(),
        };
        len <= MAX_MEDIUM_INDEX
    }
}

/// A renderable scene over any [`Intersect`] provider.
pub struct Scene<A = PrimitiveList> {
    aggregate: A,
    media: MediaSet,
    camera_medium: MediumStack,
}

impl Scene<PrimitiveList> {
    /// Empty scene backed by a linear scan.
    pub fn new() -> Self {
        Self::with_aggregate(PrimitiveList::new())
    }

    pub fn add(&mut self, primitive: impl Primitive + 'static) {
        self.aggregate.add(Box::new(primitive));
    }
}

impl Default for Scene<PrimitiveList> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Intersect> Scene<A> {
    pub fn with_aggregate(aggregate: A) -> Self {
        Self {
            aggregate,
            media: MediaSet::new(),
            camera_medium: MediumStack::VACUUM,
        }
    }

    pub fn aggregate(&self) -> &A {
        &self.aggregate
    }

    pub fn media(&self) -> &MediaSet {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut MediaSet {
        &mut self.media
    }

    pub fn add_homogeneous_medium(&mut self, medium: HomogeneousMedium) -> MediumStack {
        self.media.add_homogeneous(medium)
    }

    pub fn add_grid_medium(&mut self, medium: GridMedium) -> MediumStack {
        self.media.add_grid(medium)
    }

    /// Medium primary rays start in.
    pub fn camera_medium(&self) -> MediumStack {
        self.camera_medium
    }

    pub fn set_camera_medium(&mut self, medium: MediumStack) {
        self.camera_medium = medium;
    }

    /// Closest surface hit with `t` in `(t_min, t_max)`.
    #[inline]
    pub fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<SurfaceInteraction<'_>> {
        self.aggregate.intersect(ray, t_min, t_max)
    }
}
