use std::path::{Path, PathBuf};

use color_eyre::{Result, eyre::eyre};
use nonempty::NonEmpty;

use crate::{
    naming::{default_file_name, indexed_path},
    params::GenerationParams,
    prompts::PromptEntry,
};

/// Where the images of a job end up.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    /// Named after prompt, steps and scale inside the output directory.
    Derived,
    /// A fixed path. When `shared` images are written to it, image `n` of
    /// the job gets the suffix `index_base + n`.
    Explicit {
        path: PathBuf,
        shared: u64,
        index_base: u64,
    },
}

/// One call to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub iteration: u32,
    pub prompt: String,
    pub target: OutputTarget,
}

impl Job {
    pub fn output_path(&self, params: &GenerationParams, sample: u32, out_dir: &Path) -> PathBuf {
        match &self.target {
            OutputTarget::Derived => {
                let idx =
                    u64::from(self.iteration) * u64::from(params.samples) + u64::from(sample) + 1;
                out_dir.join(default_file_name(
                    &self.prompt,
                    params.steps,
                    params.scale,
                    idx,
                ))
            }
            OutputTarget::Explicit { path, shared, .. } if *shared <= 1 => path.clone(),
            OutputTarget::Explicit {
                path, index_base, ..
            } => indexed_path(path, index_base + u64::from(sample)),
        }
    }
}

/// Lays out the model calls of a run. With a prompt file, there is one job per
/// entry; otherwise `iters` jobs for the single prompt.
pub fn plan(
    params: &GenerationParams,
    multi_prompts: Option<&NonEmpty<PromptEntry>>,
) -> Result<Vec<Job>> {
    if let Some(entries) = multi_prompts {
        return Ok(entries
            .iter()
            .zip(0..)
            .map(|(entry, iteration)| Job {
                iteration,
                prompt: entry.prompt.clone(),
                target: OutputTarget::Explicit {
                    path: entry.output_path.clone(),
                    shared: params.samples.into(),
                    index_base: 0,
                },
            })
            .collect());
    }

    let prompt = params
        .prompt
        .clone()
        .ok_or(eyre!("No prompt given, pass --prompt or --multi-prompt"))?;
    let total = params.iters.checked_mul(params.samples).ok_or(eyre!(
        "--iters {} with --samples {} asks for more images than can be numbered",
        params.iters,
        params.samples
    ))?;

    Ok((0..params.iters)
        .map(|iteration| Job {
            iteration,
            prompt: prompt.clone(),
            target: match &params.output_path {
                None => OutputTarget::Derived,
                Some(path) => OutputTarget::Explicit {
                    path: path.clone(),
                    shared: total.into(),
                    index_base: u64::from(iteration) * u64::from(params.samples),
                },
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use nonempty::nonempty;

    use super::*;

    fn params(prompt: &str) -> GenerationParams {
        GenerationParams {
            prompt: Some(prompt.into()),
            ..GenerationParams::default()
        }
    }

    fn paths(params: &GenerationParams, jobs: &[Job]) -> Vec<PathBuf> {
        jobs.iter()
            .flat_map(|job| {
                (0..params.samples).map(|s| job.output_path(params, s, Path::new("outputs")))
            })
            .collect()
    }

    #[test]
    fn single_prompt_derived_names() -> Result<()> {
        let params = GenerationParams {
            iters: 2,
            samples: 2,
            ..params("a cat")
        };
        let jobs = plan(&params, None)?;
        assert_eq!(jobs.len(), 2);
        assert_eq!(
            paths(&params, &jobs),
            [1, 2, 3, 4]
                .map(|n| PathBuf::from(format!(
                    "outputs/a_cat__steps_50__scale_7.50__n_{n}.png"
                )))
                .to_vec()
        );
        Ok(())
    }

    #[test]
    fn single_explicit_path_is_kept_for_one_image() -> Result<()> {
        let params = GenerationParams {
            output_path: Some("shots/cat.png".into()),
            ..params("a cat")
        };
        let jobs = plan(&params, None)?;
        assert_eq!(paths(&params, &jobs), vec![PathBuf::from("shots/cat.png")]);
        Ok(())
    }

    #[test]
    fn shared_explicit_path_gets_run_wide_index() -> Result<()> {
        let params = GenerationParams {
            output_path: Some("cat.png".into()),
            iters: 2,
            samples: 2,
            ..params("a cat")
        };
        let jobs = plan(&params, None)?;
        assert_eq!(
            paths(&params, &jobs),
            ["cat-0.png", "cat-1.png", "cat-2.png", "cat-3.png"]
                .map(PathBuf::from)
                .to_vec()
        );
        Ok(())
    }

    #[test]
    fn multi_prompt_uses_entry_paths() -> Result<()> {
        let entries = nonempty![
            PromptEntry {
                prompt: "a fox".into(),
                output_path: "fox.png".into(),
            },
            PromptEntry {
                prompt: "an owl".into(),
                output_path: "owl.png".into(),
            },
        ];
        let params = GenerationParams {
            multi_prompt: Some("prompts.json".into()),
            ..GenerationParams::default()
        }
        .with_multi_prompt(&entries);

        let jobs = plan(&params, Some(&entries))?;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].prompt, "an owl");
        assert_eq!(jobs[1].iteration, 1);
        assert_eq!(
            paths(&params, &jobs),
            vec![PathBuf::from("fox.png"), PathBuf::from("owl.png")]
        );

        let params = GenerationParams {
            samples: 2,
            ..params
        };
        let jobs = plan(&params, Some(&entries))?;
        assert_eq!(
            paths(&params, &jobs),
            ["fox-0.png", "fox-1.png", "owl-0.png", "owl-1.png"]
                .map(PathBuf::from)
                .to_vec()
        );
        Ok(())
    }

    #[test]
    fn missing_prompt_is_an_error() {
        assert!(plan(&GenerationParams::default(), None).is_err());
    }

    #[test]
    fn image_count_overflow_is_an_error() {
        let params = GenerationParams {
            output_path: Some("cat.png".into()),
            iters: 70_000,
            samples: 70_000,
            ..params("a cat")
        };
        let err = plan(&params, None).unwrap_err();
        assert!(err.to_string().contains("more images than can be numbered"));
    }

    #[test]
    fn large_indices_do_not_wrap() {
        let params = GenerationParams {
            samples: u32::MAX,
            ..params("a cat")
        };
        let job = Job {
            iteration: 1,
            prompt: "a cat".into(),
            target: OutputTarget::Derived,
        };
        assert_eq!(
            job.output_path(&params, u32::MAX - 1, Path::new("outputs")),
            PathBuf::from(format!(
                "outputs/a_cat__steps_50__scale_7.50__n_{}.png",
                2 * u64::from(u32::MAX)
            ))
        );

        let job = Job {
            target: OutputTarget::Explicit {
                path: "cat.png".into(),
                shared: 2 * u64::from(u32::MAX),
                index_base: u64::from(u32::MAX),
            },
            ..job
        };
        assert_eq!(
            job.output_path(&params, u32::MAX - 1, Path::new("outputs")),
            PathBuf::from(format!("cat-{}.png", 2 * u64::from(u32::MAX) - 1))
        );
    }
}
