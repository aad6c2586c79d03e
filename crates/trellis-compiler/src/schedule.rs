//! Wave scheduling for concurrent blocks.
//!
//! A step's wave is one more than the highest wave among the siblings it
//! references; steps with no in-block references run in the first wave.

use std::collections::BTreeSet;

use trellis_coordinate::Coordinates;

/// Sibling indices each step depends on, given the coordinates every step
/// references and each step's own coordinates.
pub(crate) fn sibling_dependencies(
  steps: &[Coordinates],
  references: &[Vec<Coordinates>],
) -> Vec<BTreeSet<usize>> {
  references
    .iter()
    .enumerate()
    .map(|(index, refs)| {
      steps
        .iter()
        .enumerate()
        .filter(|(other, step)| {
          *other != index && refs.iter().any(|r| r.is_within(step))
        })
        .map(|(other, _)| other)
        .collect()
    })
    .collect()
}

/// Group step indices into waves.
///
/// Returns the index of a step on a cycle if the dependencies are cyclic.
pub(crate) fn waves(dependencies: &[BTreeSet<usize>]) -> Result<Vec<Vec<usize>>, usize> {
  // 0 = unvisited, 1 = in progress, 2 = done
  let mut color = vec![0u8; dependencies.len()];
  let mut level = vec![0usize; dependencies.len()];

  fn visit(
    node: usize,
    dependencies: &[BTreeSet<usize>],
    color: &mut [u8],
    level: &mut [usize],
  ) -> Result<usize, usize> {
    match color[node] {
      1 => return Err(node),
      2 => return Ok(level[node]),
      _ => {}
    }
    color[node] = 1;
    let mut own = 0;
    for &dependency in &dependencies[node] {
      own = own.max(visit(dependency, dependencies, color, level)? + 1);
    }
    color[node] = 2;
    level[node] = own;
    Ok(own)
  }

  for node in 0..dependencies.len() {
    visit(node, dependencies, &mut color, &mut level)?;
  }

  let depth = level.iter().copied().max().map_or(0, |max| max + 1);
  let mut waves = vec![Vec::new(); depth];
  for (node, wave) in level.into_iter().enumerate() {
    waves[wave].push(node);
  }
  Ok(waves)
}
