//! Write identified inertial parameters back into a URDF document.

use crate::{Result, UrdfError};
use idyn_math::PARAMS_PER_LINK;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Replace the inertials of the named links.
///
/// `params` holds one barycentric block per entry of `link_names`:
/// `[m, c_x, c_y, c_z, I_xx, I_xy, I_xz, I_yy, I_yz, I_zz]` with the COM in
/// the link frame and the rotational inertia about the COM. Each named
/// link gets `mass@value`, `inertial/origin@xyz` (with `rpy="0 0 0"`) and
/// `inertia@ixx..izz` from its block; missing elements are inserted. All
/// other content passes through unchanged.
pub fn rewrite_inertials(xml: &str, params: &[f64], link_names: &[String]) -> Result<String> {
    if params.len() != PARAMS_PER_LINK * link_names.len() {
        return Err(UrdfError::InvalidUrdf(format!(
            "{} parameters for {} links",
            params.len(),
            link_names.len()
        )));
    }
    let blocks: HashMap<&str, &[f64]> = link_names
        .iter()
        .zip(params.chunks_exact(PARAMS_PER_LINK))
        .map(|(name, block)| (name.as_str(), block))
        .collect();

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut stack: Vec<String> = Vec::new();
    let mut state = LinkState::default();
    let mut rewritten = 0usize;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match depth_tag(&stack, &tag) {
                    (1, "link") => {
                        state = LinkState::enter(&e, &blocks)?;
                        write(&mut writer, Event::Start(e))?;
                    }
                    (2, "inertial") if state.block.is_some() => {
                        state.inertial = true;
                        write(&mut writer, Event::Start(e))?;
                    }
                    (3, child) if stack[2] == "inertial" && state.block.is_some() => {
                        let replaced = state.replace(child, &e)?;
                        write(&mut writer, Event::Start(replaced))?;
                    }
                    _ => write(&mut writer, Event::Start(e))?,
                }
                stack.push(tag);
            }
            Event::Empty(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match depth_tag(&stack, &tag) {
                    (1, "link") => {
                        let state = LinkState::enter(&e, &blocks)?;
                        match state.block {
                            Some(block) => {
                                write(&mut writer, Event::Start(e.clone()))?;
                                write_inertial(&mut writer, block)?;
                                write(&mut writer, Event::End(BytesEnd::new(tag)))?;
                                rewritten += 1;
                            }
                            None => write(&mut writer, Event::Empty(e))?,
                        }
                    }
                    (2, "inertial") => match state.block {
                        Some(block) => {
                            state.inertial = true;
                            write_inertial(&mut writer, block)?;
                        }
                        None => write(&mut writer, Event::Empty(e))?,
                    },
                    (3, child) if stack[2] == "inertial" && state.block.is_some() => {
                        let replaced = state.replace(child, &e)?;
                        write(&mut writer, Event::Empty(replaced))?;
                    }
                    _ => write(&mut writer, Event::Empty(e))?,
                }
            }
            Event::End(e) => {
                stack.pop();
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if let Some(block) = state.block {
                    match depth_tag(&stack, &tag) {
                        (2, "inertial") => state.complete_inertial(&mut writer, block)?,
                        (1, "link") => {
                            if !state.inertial {
                                write_inertial(&mut writer, block)?;
                            }
                            state = LinkState::default();
                            rewritten += 1;
                        }
                        _ => {}
                    }
                }
                write(&mut writer, Event::End(e))?;
            }
            Event::Eof => break,
            other => write(&mut writer, other)?,
        }
    }

    if rewritten < link_names.len() {
        warn!(
            requested = link_names.len(),
            rewritten, "some links were not found in the URDF document"
        );
    }
    debug!(rewritten, "rewrote link inertials");

    String::from_utf8(writer.into_inner()).map_err(|e| UrdfError::WriteError(e.to_string()))
}

/// Rewrite progress of the `<link>` currently open.
#[derive(Debug, Default)]
struct LinkState<'p> {
    block: Option<&'p [f64]>,
    inertial: bool,
    origin: bool,
    mass: bool,
    inertia: bool,
}

impl<'p> LinkState<'p> {
    fn enter(e: &BytesStart, blocks: &HashMap<&str, &'p [f64]>) -> Result<Self> {
        let mut block = None;
        for attr in e.attributes() {
            let attr = attr.map_err(|e| UrdfError::InvalidUrdf(e.to_string()))?;
            if attr.key.as_ref() == b"name" {
                block = blocks.get(attr.unescape_value()?.as_ref()).copied();
            }
        }
        Ok(Self {
            block,
            ..Self::default()
        })
    }

    fn replace(&mut self, tag: &str, e: &BytesStart) -> Result<BytesStart<'static>> {
        let Some(block) = self.block else {
            return Ok(e.to_owned().into_owned());
        };
        let values = match tag {
            "origin" => {
                self.origin = true;
                origin_values(block)
            }
            "mass" => {
                self.mass = true;
                mass_values(block)
            }
            "inertia" => {
                self.inertia = true;
                inertia_values(block)
            }
            _ => return Ok(e.to_owned().into_owned()),
        };
        with_values(tag, e, &values)
    }

    /// Insert whichever inertial children the document did not have.
    fn complete_inertial(&mut self, writer: &mut Writer<Vec<u8>>, block: &[f64]) -> Result<()> {
        if !self.origin {
            write(writer, Event::Empty(element("origin", &origin_values(block))))?;
        }
        if !self.mass {
            write(writer, Event::Empty(element("mass", &mass_values(block))))?;
        }
        if !self.inertia {
            write(writer, Event::Empty(element("inertia", &inertia_values(block))))?;
        }
        Ok(())
    }
}

fn depth_tag<'t>(stack: &[String], tag: &'t str) -> (usize, &'t str) {
    if stack.first().map(String::as_str) == Some("robot") {
        (stack.len(), tag)
    } else {
        (0, tag)
    }
}

fn origin_values(block: &[f64]) -> Vec<(&'static str, String)> {
    vec![
        ("xyz", format!("{} {} {}", block[1], block[2], block[3])),
        ("rpy", "0 0 0".to_string()),
    ]
}

fn mass_values(block: &[f64]) -> Vec<(&'static str, String)> {
    vec![("value", block[0].to_string())]
}

fn inertia_values(block: &[f64]) -> Vec<(&'static str, String)> {
    ["ixx", "ixy", "ixz", "iyy", "iyz", "izz"]
        .iter()
        .zip(&block[4..PARAMS_PER_LINK])
        .map(|(k, v)| (*k, v.to_string()))
        .collect()
}

/// Copy `e`, replacing the listed attributes and appending missing ones.
fn with_values(
    tag: &str,
    e: &BytesStart,
    values: &[(&str, String)],
) -> Result<BytesStart<'static>> {
    let mut out = BytesStart::new(tag.to_string());
    let mut pending: Vec<&(&str, String)> = values.iter().collect();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| UrdfError::InvalidUrdf(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        match pending.iter().position(|(k, _)| *k == key) {
            Some(pos) => {
                let (k, v) = pending.remove(pos);
                out.push_attribute((*k, v.as_str()));
            }
            None => out.push_attribute(attr),
        }
    }
    for (k, v) in pending {
        out.push_attribute((*k, v.as_str()));
    }
    Ok(out)
}

fn element(tag: &str, values: &[(&str, String)]) -> BytesStart<'static> {
    let mut out = BytesStart::new(tag.to_string());
    for (k, v) in values {
        out.push_attribute((*k, v.as_str()));
    }
    out
}

fn write_inertial(writer: &mut Writer<Vec<u8>>, block: &[f64]) -> Result<()> {
    write(writer, Event::Start(BytesStart::new("inertial")))?;
    write(writer, Event::Empty(element("origin", &origin_values(block))))?;
    write(writer, Event::Empty(element("mass", &mass_values(block))))?;
    write(writer, Event::Empty(element("inertia", &inertia_values(block))))?;
    write(writer, Event::End(BytesEnd::new("inertial")))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| UrdfError::WriteError(e.to_string()))
}
