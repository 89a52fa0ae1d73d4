// (C) Copyright 2021 Hewlett Packard Enterprise Development LP

extern crate dockerfile_ast;

use dockerfile_ast::*;
use indoc::indoc;
use pretty_assertions::assert_eq;

mod common;
use common::*;

#[test]
fn roundtrip_identity() {
  let inputs = [
    "",
    "\n\n",
    "# only a comment",
    "FROM alpine",
    "FROM alpine\n",
    "  from   alpine:3.12   as   Build  \n\n\n",
    "FROM alpine\r\nRUN echo hi\r\n",
    "# syntax=docker/dockerfile:1\n\n# escape=\\\nFROM alpine\n",
    "FROM alpine\nRUN echo a \\\n  # interleaved comment\n  && echo b\n",
    "FROM alpine\nRUN echo a \\\n\n  && echo b\n",
    "FROM alpine\nRUN apk add \\\n",
    "FROM alpine\nCOPY <<EOF /etc/motd\nhello\nEOF\nRUN true\n",
    "FROM alpine\nRUN <<EOF\nnever terminated\n",
    "FROM alpine\nFROBNICATE the widgets\nCOPY onlyone\nHEALTHCHECK\n",
    "FROM alpine\nRUN [\"broken\", \n",
    "\tFROM\talpine\t\n\tENV A 1\n\tLABEL a=b c=\"d e\"\n",
  ];

  for input in inputs.iter() {
    assert_eq!(&reprint(input), input);
  }
}

#[test]
fn roundtrip_full_file() {
  let input = indoc!(r#"
    # syntax=docker/dockerfile:1.4
    # escape=\

    # global settings
    ARG BASE=alpine
    ARG TAG=3.12

    FROM ${BASE}:${TAG} AS build
    WORKDIR /src
    COPY --chown=app:app . .
    RUN set -eux; \
        apk add --no-cache \
          # tools
          curl \
          make; \
        make all

    RUN <<-EOF
    	echo "tabs are stripped"
    	EOF

    FROM scratch
    COPY --from=build /src/out /out
    ENV PATH=/out:$PATH \
        MODE=release
    EXPOSE 8080/tcp
    VOLUME ["/data"]
    USER 1000:1000
    HEALTHCHECK --interval=30s --timeout=3s \
      CMD ["/out/healthcheck"]
    ONBUILD RUN echo triggered
    STOPSIGNAL SIGQUIT
    SHELL ["/bin/sh", "-c"]
    ENTRYPOINT ["/out/app"]
    CMD ["--help"]

    # trailing comment
  "#);

  let (dockerfile, diagnostics) = Dockerfile::build(input);
  assert!(diagnostics.is_empty(), "{:?}", diagnostics);
  assert_eq!(dockerfile.to_string(), input);
  assert_eq!(dockerfile.stages.len(), 2);
  assert_eq!(dockerfile.preamble.len(), 2);
  assert_eq!(dockerfile.directives.len(), 2);
}

#[test]
fn roundtrip_edit_keeps_neighbors() {
  let input = "FROM alpine\n# keep me\nENV A=1\n\nRUN  true   \n";
  let mut dockerfile = Dockerfile::parse(input);

  if let Instruction::Env(env) = dockerfile.stages[0].instructions[1].instruction_mut() {
    env.vars.push(KeyValuePair::new("C", "3 4"));
  }

  let printed = dockerfile.to_string();
  assert_eq!(printed, "FROM alpine\n# keep me\nENV A=1 C=\"3 4\"\n\nRUN  true   \n");

  // printing the result again is stable
  assert_eq!(reprint(&printed), printed);

  let reparsed = Dockerfile::parse(&printed);
  let env = reparsed.stages[0].instructions[1].instruction().as_env().unwrap();
  assert_eq!(env.get("C"), Some("3 4"));
}

#[test]
fn roundtrip_edit_exec() {
  let mut dockerfile = Dockerfile::parse("FROM alpine\nRUN echo hi\nCMD run\n");

  if let Instruction::Run(run) = dockerfile.stages[0].instructions[1].instruction_mut() {
    run.expr = ShellOrExecExpr::exec(vec!["echo", "say \"hi\""]);
  }

  dockerfile.stages[0].instructions[2].set_instruction(CmdInstruction::shell("run --fast"));

  assert_eq!(
    dockerfile.to_string(),
    "FROM alpine\nRUN [\"echo\", \"say \\\"hi\\\"\"]\nCMD run --fast\n"
  );
}

/// Everything an edit must leave alone: decoded pairs, heredoc modes and
/// bodies, and every resolved value, in document order.
fn meaning(dockerfile: &Dockerfile) -> Vec<String> {
  let mut out = Vec::new();

  for instruction in dockerfile.instructions() {
    if let Some(env) = instruction.as_env() {
      out.extend(pairs(&env.vars).into_iter().map(|(k, v)| format!("env {}={:?}", k, v)));
    }

    if let Some(label) = instruction.as_label() {
      out.extend(pairs(&label.labels).into_iter().map(|(k, v)| format!("label {}={:?}", k, v)));
    }

    out.extend(instruction.heredocs().iter().map(|h| {
      format!("heredoc {} expand={} {:?}", h.delimiter, h.expand, h.content())
    }));
  }

  let scopes = dockerfile.resolve_scopes();
  for step in scopes.stages.iter().flat_map(|s| s.steps.iter()) {
    out.extend(step.expansions.iter().map(|e| format!("value {:?}", e.value)));
  }

  out
}

#[test]
fn roundtrip_edit_preserves_semantics() {
  let inputs = [
    indoc!(r#"
      FROM alpine
      ENV HOME=/root
      ENV A='$HOME' B=x\ y C="$HOME/c"
      ENV P C:\\dir
      ENV E ""
      ENV F=
      WORKDIR $A
      USER "$HOME"
      LABEL note='$HOME & friends'
      COPY <<'EOF' /x
      $HOME
      EOF
      ADD --chmod=644 <<"END" <<MORE /y/
      $HOME
      END
      $HOME
      MORE
    "#),
    indoc!(r#"
      # escape=`
      FROM mcr.microsoft.com/windows
      ENV P C:\dir
      ENV Q="C:\tmp `$NOT" R='$HOME'
      WORKDIR $P
    "#),
  ];

  for input in inputs.iter() {
    let mut dockerfile = Dockerfile::parse(input);
    let before = meaning(&dockerfile);

    for stage in dockerfile.stages.iter_mut() {
      for node in stage.instructions.iter_mut() {
        node.instruction_mut();
      }
    }

    let printed = dockerfile.to_string();
    assert_eq!(meaning(&dockerfile), before, "edited tree of {:?}", input);
    assert_eq!(meaning(&Dockerfile::parse(&printed)), before, "reparse of {:?}", printed);

    // printing the result again is stable
    assert_eq!(reprint(&printed), printed);
  }

  let dockerfile = Dockerfile::parse(inputs[0]);
  let values = meaning(&dockerfile);
  assert!(values.contains(&"env A=\"$HOME\"".to_string()));
  assert!(values.contains(&"heredoc EOF expand=false \"$HOME\\n\"".to_string()));
  assert!(values.contains(&"value \"/root\\n\"".to_string()));
}

#[test]
fn roundtrip_removal() {
  let input = "FROM alpine\n# keep me\nENV A=1\nRUN true\n";

  // comments travel with the node they precede
  let mut dockerfile = Dockerfile::parse(input);
  dockerfile.stages[0].instructions.remove(1);
  assert_eq!(dockerfile.to_string(), "FROM alpine\nRUN true\n");

  let mut dockerfile = Dockerfile::parse(input);
  dockerfile.stages[0].instructions.pop();
  assert_eq!(dockerfile.to_string(), "FROM alpine\n# keep me\nENV A=1\n");
}

#[test]
fn roundtrip_new_nodes() {
  let mut dockerfile = Dockerfile::parse("FROM alpine AS build\nRUN make\n");

  let mut stage_from = FromInstruction::new("scratch", None);
  stage_from.index = 1;

  dockerfile.stages[0].instructions.push(Node::new(LabelInstruction::new(vec![
    KeyValuePair::new("org.example.name", "demo app"),
  ])));
  dockerfile.stages[0].instructions.push(Node::new(stage_from));

  let mut copy = CopyInstruction::new(vec!["/src/out"], "/out");
  copy.flags.push(Flag::new("from", Some("build")));
  dockerfile.stages[0].instructions.push(Node::new(copy));

  let printed = dockerfile.to_string();
  assert_eq!(
    printed,
    indoc!(r#"
      FROM alpine AS build
      RUN make
      LABEL org.example.name="demo app"
      FROM scratch
      COPY --from=build /src/out /out
    "#)
  );

  // a reparse sees the new stage
  let reparsed = Dockerfile::parse(&printed);
  assert_eq!(reparsed.stages.len(), 2);
  assert_eq!(reparsed.stages[1].parent, StageParent::Scratch);
}

#[test]
fn roundtrip_backtick_escape() {
  let input = indoc!(r#"
    # escape=`
    FROM mcr.microsoft.com/windows/servercore
    COPY testfile.txt c:\
    RUN dir c:\ `
        /s
  "#);

  let mut dockerfile = Dockerfile::parse(input);
  assert_eq!(dockerfile.escape, '`');
  assert_eq!(dockerfile.to_string(), input);

  let copy = dockerfile.stages[0].instructions[1].instruction().as_copy().unwrap();
  assert_eq!(copy.destination.content, "c:\\");

  dockerfile.stages[0].instructions.push(Node::new(WorkdirInstruction::new("c:\\my app")));
  assert!(dockerfile.to_string().ends_with("/s\nWORKDIR \"c:\\my app\"\n"));
}
