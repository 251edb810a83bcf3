/*

Kdenlive guides:

  <property name="kdenlive:docproperties.guides">[{"comment":"Intro","pos":0,"type":0},{"comment":"Part Two","pos":250,"type":0}]</property>

become FFMETADATA chapters (25 fps, 1000 frames):

  [CHAPTER]
  TIMEBASE=1/1000000000
  START=0
  END=9960000000
  title=Intro
  [CHAPTER]
  TIMEBASE=1/1000000000
  START=10000000000
  END=39960000000
  title=Part Two

*/

pub mod chapters;
pub mod error;
pub mod pipeline;
pub mod project;
pub mod remux;
pub mod temp;

pub use error::{Error, ParseError, Result, ToolError};
pub use pipeline::{Options, Summary, run};
