//! Path integrator producing one deep sample per camera path.

use crate::medium::sample_henyey_greenstein;
use crate::primitive::Intersect;
use crate::sampler::Sampler;
use crate::volume::sample_medium;
use crate::{Ray, RenderConfig, Scene};
use skwr_core::DeepSample;
use skwr_math::Spectrum;

/// Depth interval and opacity of the first event along the camera ray.
#[derive(Debug, Clone, Copy)]
struct FirstEvent {
    alpha: f32,
    z_front: f32,
    z_back: f32,
}

/// Trace one path starting at `primary`.
///
/// The first event (surface hit or medium scatter) fixes the sample's depth
/// interval and alpha; later bounces only add radiance. Escaping rays pick up
/// `config.background` weighted by the path throughput. Returns `None` when
/// the primary ray meets nothing at all.
pub fn trace_path<A: Intersect>(
    primary: Ray,
    scene: &Scene<A>,
    config: &RenderConfig,
    sampler: &mut Sampler,
) -> Option<DeepSample> {
    let mut ray = primary;
    let mut beta = Spectrum::ONE;
    let mut radiance = Spectrum::ZERO;
    let mut first: Option<FirstEvent> = None;

    for _ in 0..config.max_depth {
        let hit = scene.intersect(&ray, config.ray_epsilon, f32::INFINITY);
        let t_max = hit.as_ref().map_or(f32::INFINITY, |si| si.t);

        if let Some(mi) = sample_medium(&ray, scene, t_max, sampler, &mut beta) {
            // Volumetric samples span from the event to the surface behind it
            if first.is_none() {
                first = Some(FirstEvent {
                    alpha: mi.alpha,
                    z_front: mi.t,
                    z_back: if t_max.is_finite() { t_max } else { mi.t },
                });
            }

            let direction = sample_henyey_greenstein(mi.wo, mi.g, sampler);
            ray = Ray::in_medium(mi.point, direction, ray.medium());
        } else {
            let Some(si) = hit else {
                if first.is_some() {
                    radiance += beta * config.background;
                }
                break;
            };

            if first.is_none() {
                first = Some(FirstEvent {
                    alpha: 1.0,
                    z_front: si.t,
                    z_back: si.t,
                });
            }

            let Some(scatter) = si.material.scatter(&ray, &si, sampler) else {
                break;
            };
            beta *= scatter.attenuation;
            let next = scatter.scattered;
            ray = next.with_medium(si.medium_for(next.direction(), ray.medium()));
        }

        if beta.max_element() <= 0.0 {
            break;
        }
    }

    let event = first?;
    log::trace!("Path ended with radiance {:?} at depth {}", radiance, event.z_front);
    Some(DeepSample::with_depth_range(
        radiance * event.alpha,
        event.alpha,
        event.z_front,
        event.z_back,
    ))
}
