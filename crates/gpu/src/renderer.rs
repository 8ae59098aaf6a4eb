use runtime::Frame;
use scene::camera::{Camera, Viewport};
use scene::components::Shape3D;
use scene::entity::EntityId;
use scene::world::World;

/// One draw submitted for a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Mesh {
        entity: EntityId,
        triangles: usize,
        color: [f32; 3],
        opacity: f32,
    },
    Grid {
        entity: EntityId,
        size: f64,
        divisions: u32,
        color: [f32; 3],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub frame_index: u64,
    pub camera: Camera,
    pub viewport: Viewport,
    /// Opaque draws first, then transparent ones, each in entity order.
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn mesh_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::Mesh { .. }))
            .count()
    }

    pub fn triangle_count(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                RenderCommand::Mesh { triangles, .. } => *triangles,
                RenderCommand::Grid { .. } => 0,
            })
            .sum()
    }
}

/// Read-side of the scene: turns whatever the world holds right now into a
/// command list. Never mutates the world.
pub struct Renderer;

impl Renderer {
    pub fn collect<R>(
        world: &World<R>,
        camera: Camera,
        viewport: Viewport,
        frame: Frame,
    ) -> RenderFrame {
        let mut opaque = Vec::new();
        let mut transparent = Vec::new();

        for (entity, drawable) in world.drawables() {
            let material = drawable.material;
            let command = match &drawable.shape {
                Shape3D::Mesh(mesh) => {
                    if mesh.is_empty() {
                        continue;
                    }
                    RenderCommand::Mesh {
                        entity,
                        triangles: mesh.triangles.len(),
                        color: material.color,
                        opacity: material.opacity,
                    }
                }
                Shape3D::Grid { size, divisions } => RenderCommand::Grid {
                    entity,
                    size: *size,
                    divisions: *divisions,
                    color: material.color,
                },
            };
            if material.is_transparent() {
                transparent.push(command);
            } else {
                opaque.push(command);
            }
        }

        opaque.extend(transparent);
        RenderFrame {
            frame_index: frame.index,
            camera,
            viewport,
            commands: opaque,
        }
    }
}
