//! Volume scattering: decides whether a ray scatters inside its medium
//! before reaching `t_max`.

use crate::medium::{GridMedium, HomogeneousMedium, MediumInteraction, MediumType};
use crate::primitive::Intersect;
use crate::sampler::Sampler;
use crate::{Ray, Scene};
use skwr_math::{spectrum_average, Interval, Spectrum};

/// Sample a scattering event along `ray` in `[0, t_max)`.
///
/// Returns the interaction when the ray scatters. `beta` is multiplied by
/// the estimator weight in both cases. Vacuum, unknown type tags and
/// indices past the end of the medium arrays never scatter and leave
/// `beta` unchanged.
pub fn sample_medium<A: Intersect>(
    ray: &Ray,
    scene: &Scene<A>,
    t_max: f32,
    sampler: &mut Sampler,
    beta: &mut Spectrum,
) -> Option<MediumInteraction> {
    let id = ray.medium();
    match id.medium_type() {
        Some(MediumType::Vacuum) => None,
        Some(MediumType::Homogeneous) => match scene.media().homogeneous(id.index()) {
            Some(medium) => sample_homogeneous(medium, ray, t_max, sampler, beta),
            None => {
                log::trace!("Homogeneous medium {} not in scene, treating as vacuum", id.index());
                None
            }
        },
        Some(MediumType::Grid) => match scene.media().grid(id.index()) {
            Some(medium) => sample_grid(medium, ray, t_max, sampler, beta),
            None => {
                log::trace!("Grid medium {} not in scene, treating as vacuum", id.index());
                None
            }
        },
        None => {
            log::trace!("Unknown medium tag {}, treating as vacuum", id.type_tag());
            None
        }
    }
}

/// Transmittance `exp(-sigma_t * t)`, with `t = inf` giving 0 where
/// `sigma_t > 0` and 1 elsewhere.
fn transmittance(sigma_t: Spectrum, t: f32) -> Spectrum {
    let tr = |s: f32| if s > 0.0 { (-s * t).exp() } else { 1.0 };
    Spectrum::new(tr(sigma_t.x), tr(sigma_t.y), tr(sigma_t.z))
}

/// Free-flight sampling in a uniform medium.
///
/// One color channel is picked uniformly to draw the distance; the weight
/// divides by the channel-averaged pdf.
fn sample_homogeneous(
    medium: &HomogeneousMedium,
    ray: &Ray,
    t_max: f32,
    sampler: &mut Sampler,
    beta: &mut Spectrum,
) -> Option<MediumInteraction> {
    let sigma_t = medium.sigma_t();
    if sigma_t.max_element() <= 0.0 {
        return None;
    }

    let channel = ((sampler.uniform_float() * 3.0) as usize).min(2);
    let sigma = sigma_t[channel];
    let dist = if sigma > 0.0 {
        -(1.0 - sampler.uniform_float()).ln() / sigma
    } else {
        f32::INFINITY
    };

    let t = dist.min(t_max);
    let sampled = t < t_max;
    let tr = transmittance(sigma_t, t);

    let density = if sampled { sigma_t * tr } else { tr };
    let pdf = spectrum_average(density);
    if pdf <= 0.0 {
        // Opaque over the whole segment
        *beta = Spectrum::ZERO;
        return None;
    }

    if sampled {
        *beta *= tr * medium.sigma_s / pdf;
        Some(MediumInteraction {
            point: ray.at(t),
            wo: -ray.direction(),
            t,
            alpha: 1.0 - spectrum_average(tr),
            g: medium.g,
            sigma_s: medium.sigma_s,
        })
    } else {
        *beta *= tr / pdf;
        None
    }
}

/// Delta tracking through a density grid, bounded by its majorant.
fn sample_grid(
    medium: &GridMedium,
    ray: &Ray,
    t_max: f32,
    sampler: &mut Sampler,
    beta: &mut Spectrum,
) -> Option<MediumInteraction> {
    let majorant = medium.max_density() * medium.sigma_t();
    if majorant <= 0.0 {
        return None;
    }

    let span = medium
        .bounds()
        .clip(ray.origin(), ray.direction(), Interval::new(0.0, t_max))?;

    let inv_max_density = 1.0 / medium.max_density();
    let mut t = span.min;
    loop {
        t -= (1.0 - sampler.uniform_float()).ln() / majorant;
        if t >= span.max {
            return None;
        }

        let point = ray.at(t);
        if medium.density(point) * inv_max_density > sampler.uniform_float() {
            *beta *= medium.sigma_s() / medium.sigma_t();
            return Some(MediumInteraction {
                point,
                wo: -ray.direction(),
                t,
                // Delta tracking carries no transmittance estimate
                alpha: 1.0,
                g: medium.g(),
                sigma_s: medium.sigma_s(),
            });
        }
    }
}
