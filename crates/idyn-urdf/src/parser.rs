//! URDF XML parser implementation.

use crate::{Result, UrdfError, parse_f64, parse_vec3};
use idyn_math::{Mat3, SpatialInertia, SpatialTransform, Vec3, symmetric_from_params};
use idyn_model::{Joint, Model, ModelBuilder};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

/// Parsed `<link>` element.
#[derive(Debug, Clone)]
struct LinkElement {
    name: String,
    inertial: Option<InertialElement>,
}

/// Parsed `<inertial>` element. `inertia` holds `ixx ixy ixz iyy iyz izz`.
#[derive(Debug, Clone, Default)]
struct InertialElement {
    xyz: Vec3,
    rpy: Vec3,
    mass: f64,
    inertia: [f64; 6],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JointKind {
    Revolute,
    Prismatic,
    Fixed,
}

/// Parsed `<joint>` element.
#[derive(Debug, Clone)]
struct JointElement {
    name: String,
    kind: JointKind,
    parent: String,
    child: String,
    xyz: Vec3,
    rpy: Vec3,
    axis: Vec3,
}

/// URDF loader.
pub struct UrdfLoader {
    robot_name: String,
    links: Vec<LinkElement>,
    joints: Vec<JointElement>,
}

impl UrdfLoader {
    /// Load URDF from file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let xml_content = fs::read_to_string(path)?;
        Self::from_xml_str(&xml_content)
    }

    /// Load URDF from XML string.
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let mut loader = Self {
            robot_name: String::new(),
            links: Vec::new(),
            joints: Vec::new(),
        };
        loader.parse_xml(xml)?;
        Ok(loader)
    }

    pub fn robot_name(&self) -> &str {
        &self.robot_name
    }

    fn parse_xml(&mut self, xml: &str) -> Result<()> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        // Names of the currently open elements.
        let mut stack: Vec<String> = Vec::new();
        let mut seen_robot = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    self.parse_element(&tag_name, &e, &stack, &mut seen_robot)?;
                    stack.push(tag_name);
                }
                Ok(Event::Empty(e)) => {
                    let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    self.parse_element(&tag_name, &e, &stack, &mut seen_robot)?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(UrdfError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        if !seen_robot {
            return Err(UrdfError::InvalidUrdf("missing <robot> root element".to_string()));
        }
        Ok(())
    }

    fn parse_element(
        &mut self,
        tag_name: &str,
        e: &BytesStart,
        stack: &[String],
        seen_robot: &mut bool,
    ) -> Result<()> {
        let path: Vec<&str> = stack.iter().map(String::as_str).collect();
        match (path.as_slice(), tag_name) {
            ([], "robot") => {
                *seen_robot = true;
                self.robot_name = attributes(e)?.remove("name").unwrap_or_default();
            }
            ([], other) => {
                return Err(UrdfError::InvalidUrdf(format!(
                    "root element is <{other}>, expected <robot>"
                )));
            }
            (["robot"], "link") => {
                let name = required(&attributes(e)?, "name", "link")?;
                self.links.push(LinkElement { name, inertial: None });
            }
            (["robot"], "joint") => self.parse_joint(e)?,
            (["robot", "link"], "inertial") => {
                if let Some(link) = self.links.last_mut() {
                    link.inertial = Some(InertialElement::default());
                }
            }
            (["robot", "link", "inertial"], child) => self.parse_inertial(child, e)?,
            (["robot", "joint"], child) => self.parse_joint_child(child, e)?,
            // Visual, collision and vendor extensions are ignored.
            _ => {}
        }
        Ok(())
    }

    fn parse_joint(&mut self, e: &BytesStart) -> Result<()> {
        let attrs = attributes(e)?;
        let name = required(&attrs, "name", "joint")?;
        let ty = required(&attrs, "type", "joint")?;
        let kind = match ty.as_str() {
            "revolute" | "continuous" => JointKind::Revolute,
            "prismatic" => JointKind::Prismatic,
            "fixed" => JointKind::Fixed,
            other => {
                return Err(UrdfError::InvalidUrdf(format!(
                    "joint {name}: unsupported type \"{other}\""
                )));
            }
        };
        self.joints.push(JointElement {
            name,
            kind,
            parent: String::new(),
            child: String::new(),
            xyz: Vec3::zeros(),
            rpy: Vec3::zeros(),
            // URDF default axis
            axis: Vec3::x(),
        });
        Ok(())
    }

    fn parse_joint_child(&mut self, tag_name: &str, e: &BytesStart) -> Result<()> {
        let attrs = attributes(e)?;
        let Some(joint) = self.joints.last_mut() else {
            return Ok(());
        };
        match tag_name {
            "parent" => joint.parent = required(&attrs, "link", "joint parent")?,
            "child" => joint.child = required(&attrs, "link", "joint child")?,
            "origin" => {
                if let Some(v) = attrs.get("xyz") {
                    joint.xyz = parse_vec3("joint origin xyz", v)?;
                }
                if let Some(v) = attrs.get("rpy") {
                    joint.rpy = parse_vec3("joint origin rpy", v)?;
                }
            }
            "axis" => {
                if let Some(v) = attrs.get("xyz") {
                    joint.axis = parse_vec3("joint axis", v)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn parse_inertial(&mut self, tag_name: &str, e: &BytesStart) -> Result<()> {
        let attrs = attributes(e)?;
        let Some(inertial) = self.links.last_mut().and_then(|l| l.inertial.as_mut()) else {
            return Ok(());
        };
        match tag_name {
            "origin" => {
                if let Some(v) = attrs.get("xyz") {
                    inertial.xyz = parse_vec3("inertial origin xyz", v)?;
                }
                if let Some(v) = attrs.get("rpy") {
                    inertial.rpy = parse_vec3("inertial origin rpy", v)?;
                }
            }
            "mass" => {
                inertial.mass = parse_f64("mass", &required(&attrs, "value", "mass")?)?;
            }
            "inertia" => {
                for (slot, key) in ["ixx", "ixy", "ixz", "iyy", "iyz", "izz"].iter().enumerate() {
                    if let Some(v) = attrs.get(*key) {
                        inertial.inertia[slot] = parse_f64(key, v)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Names of all links in document order, including the root.
    pub fn link_names(&self) -> Vec<String> {
        self.links.iter().map(|l| l.name.clone()).collect()
    }

    /// Build a fixed-base model from the parsed URDF.
    ///
    /// The unique link that is nobody's child becomes the fixed base; every
    /// other link gets one parameter block, ordered depth first from it
    /// with siblings in document order.
    pub fn build_model(&self) -> Result<Model> {
        let names: HashSet<&str> = self.links.iter().map(|l| l.name.as_str()).collect();
        if names.len() != self.links.len() {
            return Err(UrdfError::InvalidUrdf("duplicate link name".to_string()));
        }

        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut has_parent: HashSet<&str> = HashSet::new();
        for (idx, joint) in self.joints.iter().enumerate() {
            for end in [&joint.parent, &joint.child] {
                if !names.contains(end.as_str()) {
                    return Err(UrdfError::InvalidUrdf(format!(
                        "joint {} references unknown link \"{end}\"",
                        joint.name
                    )));
                }
            }
            if !has_parent.insert(joint.child.as_str()) {
                return Err(UrdfError::InvalidUrdf(format!(
                    "link {} has more than one parent joint",
                    joint.child
                )));
            }
            children.entry(joint.parent.as_str()).or_default().push(idx);
        }

        let roots: Vec<&LinkElement> = self
            .links
            .iter()
            .filter(|l| !has_parent.contains(l.name.as_str()))
            .collect();
        let root = match roots.as_slice() {
            [root] => *root,
            [] => return Err(UrdfError::InvalidUrdf("no root link".to_string())),
            _ => {
                let names: Vec<&str> = roots.iter().map(|l| l.name.as_str()).collect();
                return Err(UrdfError::InvalidUrdf(format!(
                    "expected one root link, found {}",
                    names.join(", ")
                )));
            }
        };

        let by_name: HashMap<&str, &LinkElement> =
            self.links.iter().map(|l| (l.name.as_str(), l)).collect();
        let mut index: HashMap<&str, i32> = HashMap::new();
        let mut builder = ModelBuilder::new(&self.robot_name, &root.name);
        let mut added = 0usize;

        // Depth-first, preorder.
        let mut pending: Vec<usize> = children.get(root.name.as_str()).cloned().unwrap_or_default();
        pending.reverse();
        while let Some(j) = pending.pop() {
            let joint = &self.joints[j];
            let parent = index.get(joint.parent.as_str()).copied().unwrap_or(-1);
            let link = by_name[joint.child.as_str()];

            builder = builder.add_link(&link.name, parent, build_joint(joint)?, link_inertia(link));
            index.insert(link.name.as_str(), added as i32);
            added += 1;

            if let Some(next) = children.get(joint.child.as_str()) {
                pending.extend(next.iter().rev());
            }
        }

        if added + 1 != self.links.len() {
            return Err(UrdfError::InvalidUrdf(
                "links not reachable from the root (kinematic loop?)".to_string(),
            ));
        }

        let model = builder.build();
        info!(
            robot = %model.name,
            base = %model.base,
            links = model.nlinks(),
            dofs = model.ndof,
            "loaded URDF model"
        );
        Ok(model)
    }
}

fn build_joint(joint: &JointElement) -> Result<Joint> {
    let xf = SpatialTransform::from_xyz_rpy(joint.xyz, joint.rpy);
    if joint.kind != JointKind::Fixed && joint.axis.norm() < 1e-12 {
        return Err(UrdfError::InvalidUrdf(format!("joint {}: zero axis", joint.name)));
    }
    Ok(match joint.kind {
        JointKind::Revolute => Joint::revolute(&joint.name, xf, joint.axis),
        JointKind::Prismatic => Joint::prismatic(&joint.name, xf, joint.axis),
        JointKind::Fixed => Joint::fixed(&joint.name, xf),
    })
}

/// Barycentric inertia of a link in its own frame. A rotated inertial frame
/// is rotated into the link frame; a missing `<inertial>` is massless.
fn link_inertia(link: &LinkElement) -> SpatialInertia {
    match &link.inertial {
        Some(inertial) => {
            // Rotation inertial frame -> link frame.
            let r = SpatialTransform::from_xyz_rpy(Vec3::zeros(), inertial.rpy).rot.transpose();
            let inertia = r * symmetric_from_params(&inertial.inertia) * r.transpose();
            SpatialInertia::new(inertial.mass, inertial.xyz, inertia)
        }
        None => SpatialInertia::new(0.0, Vec3::zeros(), Mat3::zeros()),
    }
}

fn attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| UrdfError::InvalidUrdf(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn required(attrs: &HashMap<String, String>, key: &str, element: &str) -> Result<String> {
    attrs
        .get(key)
        .cloned()
        .ok_or_else(|| UrdfError::InvalidUrdf(format!("<{element}> without {key} attribute")))
}
