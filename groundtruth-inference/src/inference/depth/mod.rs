pub mod depth_anything;
