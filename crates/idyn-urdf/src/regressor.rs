//! Regressor structure descriptions.
//!
//! ```xml
//! <regressor>
//!   <jointTorqueDynamics>
//!     <joints>
//!       <joint>shoulder</joint>
//!       <joint>elbow</joint>
//!     </joints>
//!   </jointTorqueDynamics>
//! </regressor>
//! ```
//!
//! `<allJoints/>` in place of `<joints>` selects every DOF.

use crate::{Result, UrdfError};
use idyn_model::Model;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Which joint torques the regressor produces rows for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorqueOutputs {
    AllJoints,
    Joints(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegressorStructure {
    pub outputs: TorqueOutputs,
}

impl Default for RegressorStructure {
    fn default() -> Self {
        Self {
            outputs: TorqueOutputs::AllJoints,
        }
    }
}

impl RegressorStructure {
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<String> = Vec::new();
        let mut outputs: Option<TorqueOutputs> = None;
        let mut in_joint = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    check_path(&stack, &tag)?;
                    match tag.as_str() {
                        "joints" => {
                            outputs.get_or_insert_with(|| TorqueOutputs::Joints(Vec::new()));
                        }
                        "joint" => in_joint = true,
                        _ => {}
                    }
                    stack.push(tag);
                }
                Event::Empty(e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    check_path(&stack, &tag)?;
                    match tag.as_str() {
                        "allJoints" => outputs = Some(TorqueOutputs::AllJoints),
                        "joints" => {
                            outputs.get_or_insert_with(|| TorqueOutputs::Joints(Vec::new()));
                        }
                        _ => {}
                    }
                }
                Event::Text(t) if in_joint => {
                    let name = t.unescape()?.trim().to_string();
                    if let Some(TorqueOutputs::Joints(names)) = outputs.as_mut() {
                        names.push(name);
                    }
                }
                Event::End(_) => {
                    in_joint = false;
                    stack.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        match outputs {
            Some(TorqueOutputs::Joints(names)) if names.is_empty() => Err(
                UrdfError::InvalidRegressor("<joints> lists no joint".to_string()),
            ),
            Some(outputs) => Ok(Self { outputs }),
            None => Err(UrdfError::InvalidRegressor(
                "expected <allJoints/> or <joints> in <jointTorqueDynamics>".to_string(),
            )),
        }
    }

    /// DOF indices of the selected outputs, in description order.
    pub fn output_dofs(&self, model: &Model) -> Result<Vec<usize>> {
        match &self.outputs {
            TorqueOutputs::AllJoints => Ok((0..model.ndof).collect()),
            TorqueOutputs::Joints(names) => names
                .iter()
                .map(|name| {
                    model.dof_index(name).ok_or_else(|| {
                        UrdfError::InvalidRegressor(format!("unknown or fixed joint \"{name}\""))
                    })
                })
                .collect(),
        }
    }
}

fn check_path(stack: &[String], tag: &str) -> Result<()> {
    let parent = stack.last().map(String::as_str);
    let valid = matches!(
        (parent, tag),
        (None, "regressor")
            | (Some("regressor"), "jointTorqueDynamics")
            | (Some("jointTorqueDynamics"), "joints" | "allJoints")
            | (Some("joints"), "joint")
    );
    if valid {
        Ok(())
    } else {
        Err(UrdfError::InvalidRegressor(format!("unexpected element <{tag}>")))
    }
}
